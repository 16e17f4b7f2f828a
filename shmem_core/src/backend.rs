//! Platform backend descriptor
//!
//! The backend is fixed when the crate is compiled:
//! - `Posix`: `shm_open` + `mmap`. Identities persist until `shm_unlink`.
//! - `Windows`: `CreateFileMappingW` + `MapViewOfFile`. Identities are
//!   reference counted by the kernel and vanish with their last handle.

use crate::memory::name::{MAX_NAME_LENGTH, PORTABLE_NAME_LENGTH};
use crate::memory::platform::{NativeBackend, SharedMemoryBackend};
use std::fmt;

/// Shared memory backends known to shmem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    /// POSIX shared memory objects (Linux, macOS, BSD)
    Posix,
    /// Windows named file mappings backed by the paging file
    Windows,
}

impl Platform {
    /// Backend compiled into this build
    pub const fn current() -> Self {
        #[cfg(windows)]
        {
            Platform::Windows
        }

        #[cfg(not(windows))]
        {
            Platform::Posix
        }
    }

    /// Get platform name for logging/diagnostics
    pub fn name(&self) -> &'static str {
        match self {
            Platform::Posix => "POSIX",
            Platform::Windows => "Windows",
        }
    }

    /// Whether identities outlive their handles until explicitly removed
    pub fn requires_manual_removal(&self) -> bool {
        matches!(self, Platform::Posix)
    }

    /// Granularity the active backend rounds mappings to
    pub fn allocation_granularity() -> usize {
        NativeBackend::granularity()
    }

    pub fn max_name_length(&self) -> usize {
        MAX_NAME_LENGTH
    }

    pub fn portable_name_length(&self) -> usize {
        PORTABLE_NAME_LENGTH
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Posix => write!(f, "posix"),
            Platform::Windows => write!(f, "windows"),
        }
    }
}

impl std::str::FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "posix" | "unix" | "linux" | "macos" => Ok(Platform::Posix),
            "windows" | "win32" => Ok(Platform::Windows),
            _ => Err(format!(
                "Unknown platform: {}. Available: posix, windows",
                s
            )),
        }
    }
}
