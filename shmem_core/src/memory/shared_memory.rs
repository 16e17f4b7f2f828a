// Owning handle to a mapped shared memory segment
use super::name::SegmentName;
use super::platform::{NativeBackend, SharedMemoryBackend};
use super::types::{AccessMode, CreateMode, Discipline};
use super::view::SharedMemoryView;
use crate::config::ShmConfig;
use crate::error::{ErrorCode, ShmError, ShmResult};

/// This process's live mapping of a named shared memory segment
///
/// Dropping the value unmaps the region and closes the OS handle. The named
/// identity itself is left alone, since other processes may still use it;
/// remove it explicitly with [`SharedMemory::remove`]. On POSIX it otherwise
/// survives process exit.
///
/// The value is move-only. [`SharedMemory::take`] (or `std::mem::take`)
/// transfers the mapping and leaves the source in the canonical invalid
/// state: null data, zero size, not the creator.
///
/// A `SharedMemory` performs no locking. Any number of instances, in this or
/// other processes, may map the same identity; coordinating writes between
/// them is up to the caller.
///
/// ```no_run
/// use shmem_core::SharedMemory;
///
/// let mut writer = SharedMemory::create_only("ipc_test", 64)?;
/// writer.as_mut_slice().unwrap()[..6].copy_from_slice(b"hello\0");
///
/// let reader = SharedMemory::open_existing("ipc_test", shmem_core::AccessMode::ReadOnly)?;
/// assert_eq!(&reader.as_slice().unwrap()[..5], b"hello");
///
/// SharedMemory::remove("ipc_test");
/// # Ok::<(), shmem_core::ShmError>(())
/// ```
#[derive(Debug, Default)]
pub struct SharedMemory {
    backend: NativeBackend,
    name: String,
    mode: AccessMode,
    last_error: Option<ShmError>,
}

impl SharedMemory {
    /// Create or open a segment.
    ///
    /// `size` is required by every mode except [`CreateMode::OpenExisting`],
    /// which discovers the size from the OS and ignores the argument.
    ///
    /// With [`Discipline::FailFast`] a failure is returned as `Err`. With
    /// [`Discipline::FailSoft`] this always returns `Ok`; check
    /// [`is_valid`](Self::is_valid) and [`last_error`](Self::last_error).
    pub fn new(
        name: &str,
        size: Option<usize>,
        mode: CreateMode,
        access: AccessMode,
        discipline: Discipline,
    ) -> ShmResult<Self> {
        let config = ShmConfig {
            access,
            discipline,
            ..ShmConfig::default()
        };
        Self::with_config(name, size, mode, &config)
    }

    /// Create or open a segment using access, discipline and permissions from `config`
    pub fn with_config(
        name: &str,
        size: Option<usize>,
        mode: CreateMode,
        config: &ShmConfig,
    ) -> ShmResult<Self> {
        let mut shm = SharedMemory::default();
        shm.mode = config.access;

        match shm.acquire(name, size, mode, config) {
            Ok(()) => Ok(shm),
            Err(err) => match config.discipline {
                Discipline::FailFast => Err(err),
                Discipline::FailSoft => {
                    log::debug!("{} '{}' failed: {}", mode, name, err);
                    shm.last_error = Some(err);
                    Ok(shm)
                }
            },
        }
    }

    /// Fail-soft construction: never fails, the outcome is in `last_error()`
    pub fn try_new(name: &str, size: Option<usize>, mode: CreateMode, access: AccessMode) -> Self {
        let config = ShmConfig {
            access,
            discipline: Discipline::FailSoft,
            ..ShmConfig::default()
        };

        let mut shm = SharedMemory::default();
        shm.mode = access;
        if let Err(err) = shm.acquire(name, size, mode, &config) {
            log::debug!("{} '{}' failed: {}", mode, name, err);
            shm.last_error = Some(err);
        }
        shm
    }

    /// Create a new read-write segment, failing if the name is taken
    pub fn create_only(name: &str, size: usize) -> ShmResult<Self> {
        Self::new(
            name,
            Some(size),
            CreateMode::CreateOnly,
            AccessMode::ReadWrite,
            Discipline::FailFast,
        )
    }

    /// Open the named segment, creating it with `size` bytes if absent
    pub fn open_or_create(name: &str, size: usize) -> ShmResult<Self> {
        Self::new(
            name,
            Some(size),
            CreateMode::OpenOrCreate,
            AccessMode::ReadWrite,
            Discipline::FailFast,
        )
    }

    /// Create the named segment or reuse an existing one of at least `size` bytes
    pub fn open_always(name: &str, size: usize) -> ShmResult<Self> {
        Self::new(
            name,
            Some(size),
            CreateMode::OpenAlways,
            AccessMode::ReadWrite,
            Discipline::FailFast,
        )
    }

    /// Open a segment that must already exist
    pub fn open_existing(name: &str, access: AccessMode) -> ShmResult<Self> {
        Self::new(
            name,
            None,
            CreateMode::OpenExisting,
            access,
            Discipline::FailFast,
        )
    }

    fn acquire(
        &mut self,
        name: &str,
        size: Option<usize>,
        mode: CreateMode,
        config: &ShmConfig,
    ) -> ShmResult<()> {
        let segment = SegmentName::new(name)?;
        self.name = segment.as_str().to_string();

        if config.warn_non_portable_names && !segment.is_portable() {
            log::warn!(
                "shared memory name '{}' is longer than {} characters and will not work on macOS",
                segment,
                super::name::PORTABLE_NAME_LENGTH
            );
        }

        match mode {
            CreateMode::OpenExisting => self.backend.open(&segment, config.access)?,
            _ => {
                let size = size.ok_or_else(|| ShmError::invalid_size(0))?;
                self.backend
                    .create(&segment, size, mode, config.access, config.permissions)?
            }
        }

        log::info!(
            "{} shared memory '{}' ({}, requested: {}, granted: {} bytes, creator: {})",
            mode,
            segment,
            config.access,
            size.map_or_else(|| "-".to_string(), |s| s.to_string()),
            self.backend.size(),
            self.backend.is_creator()
        );
        Ok(())
    }

    /// Base address of the mapping, or null when invalid
    pub fn data(&self) -> *mut u8 {
        self.backend.data()
    }

    pub fn as_ptr(&self) -> *const u8 {
        self.backend.data()
    }

    /// The mapped bytes, or `None` when invalid.
    ///
    /// Other processes may write the region at any time; use atomics placed
    /// in the region when the contents must be synchronised.
    pub fn as_slice(&self) -> Option<&[u8]> {
        if !self.is_valid() {
            return None;
        }
        Some(unsafe { std::slice::from_raw_parts(self.data(), self.size()) })
    }

    /// The mapped bytes for writing, or `None` when invalid or read-only
    pub fn as_mut_slice(&mut self) -> Option<&mut [u8]> {
        if !self.is_valid() || !self.mode.is_writable() {
            return None;
        }
        Some(unsafe { std::slice::from_raw_parts_mut(self.data(), self.size()) })
    }

    /// Granted size in bytes; may exceed the requested size
    pub fn size(&self) -> usize {
        self.backend.size()
    }

    /// User-facing name, without any platform prefix
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    pub fn is_valid(&self) -> bool {
        self.backend.is_mapped()
    }

    /// Whether this instance's create/open call brought the identity into existence
    pub fn is_creator(&self) -> bool {
        self.backend.is_creator()
    }

    /// Failure recorded by a fail-soft construction, `None` on success
    pub fn last_error(&self) -> Option<&ShmError> {
        self.last_error.as_ref()
    }

    pub fn last_error_code(&self) -> ErrorCode {
        self.last_error
            .as_ref()
            .map_or(ErrorCode::Success, ShmError::code)
    }

    /// Snapshot of the mapping for sharing with threads or functions
    pub fn view(&self) -> SharedMemoryView {
        SharedMemoryView::from(self)
    }

    /// Release the mapping, keeping the OS handle open. Idempotent.
    pub fn unmap(&mut self) {
        self.backend.unmap();
    }

    /// Release the mapping and the OS handle. Idempotent.
    ///
    /// The identity is not removed; see [`SharedMemory::remove`].
    pub fn close(&mut self) {
        if self.backend.is_mapped() {
            log::debug!("closing shared memory '{}'", self.name);
        }
        self.backend.close();
    }

    /// Move the mapping out, leaving `self` invalid
    pub fn take(&mut self) -> SharedMemory {
        std::mem::take(self)
    }

    /// Remove a named identity.
    ///
    /// POSIX unlinks the name; existing mappings stay usable until closed.
    /// Windows has nothing to remove and always returns `true`. Invalid names
    /// return `false`.
    pub fn remove(name: &str) -> bool {
        match SegmentName::new(name) {
            Ok(segment) => NativeBackend::remove(&segment),
            Err(_) => false,
        }
    }

    /// Whether a named identity currently exists
    pub fn exists(name: &str) -> bool {
        match SegmentName::new(name) {
            Ok(segment) => NativeBackend::exists(&segment),
            Err(_) => false,
        }
    }
}

impl Drop for SharedMemory {
    fn drop(&mut self) {
        self.close();
    }
}
