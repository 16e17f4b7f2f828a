// Backend abstraction over the OS shared memory facility
//
// POSIX: shm_open + ftruncate + mmap, identity removed with shm_unlink
// Windows: CreateFileMappingW + MapViewOfFile, identity freed with its last handle

use super::name::SegmentName;
use super::types::{AccessMode, CreateMode};
use crate::error::ShmResult;

/// Default POSIX mode bits for new identities (before umask)
pub const DEFAULT_PERMISSIONS: u32 = 0o666;

/// Operations every shared memory backend provides
///
/// A backend value holds at most one OS handle and one mapping. It is
/// created empty, filled by exactly one `create` or `open`, and released by
/// `close` (or by dropping it).
pub trait SharedMemoryBackend: Default + Send {
    /// Create-style acquisition. `mode` is never `OpenExisting`.
    ///
    /// On failure every resource acquired along the way is released, and an
    /// identity created by this call is removed again.
    fn create(
        &mut self,
        name: &SegmentName,
        size: usize,
        mode: CreateMode,
        access: AccessMode,
        permissions: u32,
    ) -> ShmResult<()>;

    /// Open an existing identity, discovering its size from the OS
    fn open(&mut self, name: &SegmentName, access: AccessMode) -> ShmResult<()>;

    /// Release the mapping but keep the OS handle
    fn unmap(&mut self);

    /// Release the mapping and the OS handle. Never removes the identity.
    fn close(&mut self);

    /// Base address of the mapping, null when unmapped
    fn data(&self) -> *mut u8;

    /// Granted size in bytes, zero after `close`
    fn size(&self) -> usize;

    /// Whether the acquisition brought the identity into existence
    fn is_creator(&self) -> bool;

    fn is_mapped(&self) -> bool {
        !self.data().is_null()
    }

    /// Remove the identity from the OS namespace
    fn remove(name: &SegmentName) -> bool;

    /// Probe whether the identity exists, without side effects
    fn exists(name: &SegmentName) -> bool;

    /// Rounding unit of the backend's mappings
    fn granularity() -> usize;
}

#[cfg(unix)]
pub(crate) type NativeBackend = super::posix::PosixSharedMemory;

#[cfg(windows)]
pub(crate) type NativeBackend = super::windows::WindowsSharedMemory;

#[cfg(not(any(unix, windows)))]
compile_error!("shmem supports POSIX and Windows targets only");
