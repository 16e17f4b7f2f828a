//! # shmem Core
//!
//! Cross-platform named shared memory for inter-process communication.
//!
//! shmem gives one ownership-safe interface over two different OS facilities:
//!
//! - **POSIX**: `shm_open` + `ftruncate` + `mmap`
//! - **Windows**: `CreateFileMappingW` + `MapViewOfFile`
//!
//! It covers name validation, the four creation modes, requested vs. granted
//! sizes, creator tracking and the map → use → unmap → close → remove
//! lifecycle. The mapped bytes are handed out raw: no header, no locking.
//!
//! ## Quick Start
//!
//! ```no_run
//! use shmem_core::{AccessMode, SharedMemory};
//!
//! // Writer
//! let mut shm = SharedMemory::create_only("ipc_test", 64)?;
//! if let Some(bytes) = shm.as_mut_slice() {
//!     bytes[..6].copy_from_slice(b"hello\0");
//! }
//!
//! // Reader (usually another process)
//! let reader = SharedMemory::open_existing("ipc_test", AccessMode::ReadOnly)?;
//! assert!(reader.size() >= 64);
//!
//! // POSIX segments outlive the process unless removed
//! SharedMemory::remove("ipc_test");
//! # Ok::<(), shmem_core::ShmError>(())
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod memory;

// Re-export commonly used types for easy access
pub use backend::Platform;
pub use config::ShmConfig;
pub use error::{ErrorCode, ShmError, ShmResult};
pub use memory::{
    validate, AccessMode, CreateMode, Discipline, SegmentName, SharedMemory, SharedMemoryView,
};
