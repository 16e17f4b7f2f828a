//! # Named shared memory segments
//!
//! This module provides the cross-platform shared memory layer:
//!
//! - **SharedMemory**: the owning, move-only handle to a mapped segment
//! - **SharedMemoryView**: a copyable, non-owning snapshot for threads and helpers
//! - **SegmentName**: validated identities, formatted for the active backend
//!
//! ## Platform backends
//!
//! One backend is compiled per target:
//! - **POSIX**: `shm_open` + `mmap`. Segments persist until removed, even
//!   across crashes, so call [`SharedMemory::remove`] when done.
//! - **Windows**: `CreateFileMappingW` + `MapViewOfFile`. Segments disappear
//!   with their last handle; `remove` is a no-op.
//!
//! ## Memory Safety
//!
//! The mapped bytes are shared with other processes. shmem hands out the raw
//! region only; synchronising its contents (atomics with acquire/release
//! ordering, a ready flag, ...) is the caller's job.

pub mod name;
pub mod platform;
pub mod shared_memory;
pub mod types;
pub mod view;

#[cfg(unix)]
mod posix;
#[cfg(windows)]
mod windows;

pub use name::{validate, SegmentName, MAX_NAME_LENGTH, PORTABLE_NAME_LENGTH};
pub use platform::{SharedMemoryBackend, DEFAULT_PERMISSIONS};
pub use shared_memory::SharedMemory;
pub use types::{AccessMode, CreateMode, Discipline};
pub use view::SharedMemoryView;

// Tests are in the tests/ directory
