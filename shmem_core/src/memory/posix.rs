// POSIX shared memory backend: shm_open + ftruncate + mmap
//
// The shm file descriptor is wrapped in a `File` so sizing goes through
// `set_len`/`metadata`, and the mapping itself is a memmap2 map of that fd.
use super::name::SegmentName;
use super::platform::SharedMemoryBackend;
use super::types::{AccessMode, CreateMode};
use crate::error::{ErrorCode, ShmError, ShmResult};
use memmap2::{Mmap, MmapMut, MmapOptions};
use std::ffi::CString;
use std::fs::File;
use std::io;
use std::os::fd::{FromRawFd, OwnedFd};

#[derive(Debug)]
enum Mapping {
    ReadOnly(Mmap),
    ReadWrite(MmapMut),
}

/// Shared memory object mapped through `shm_open`
#[derive(Debug)]
pub struct PosixSharedMemory {
    file: Option<File>,
    mapping: Option<Mapping>,
    ptr: *mut u8,
    size: usize,
    creator: bool,
}

// The pointer aliases `mapping`, which this struct owns exclusively.
unsafe impl Send for PosixSharedMemory {}

impl Default for PosixSharedMemory {
    fn default() -> Self {
        Self {
            file: None,
            mapping: None,
            ptr: std::ptr::null_mut(),
            size: 0,
            creator: false,
        }
    }
}

fn shm_open(name: &CString, oflag: libc::c_int, permissions: u32) -> io::Result<File> {
    // shm_open is variadic on Apple targets, so the mode travels as c_uint there
    #[cfg(any(target_os = "macos", target_os = "ios"))]
    let fd = unsafe { libc::shm_open(name.as_ptr(), oflag, permissions as libc::c_uint) };

    #[cfg(not(any(target_os = "macos", target_os = "ios")))]
    let fd = unsafe { libc::shm_open(name.as_ptr(), oflag, permissions as libc::mode_t) };

    if fd == -1 {
        return Err(io::Error::last_os_error());
    }

    // shm_open returned a fresh descriptor that nothing else owns
    Ok(File::from(unsafe { OwnedFd::from_raw_fd(fd) }))
}

fn shm_unlink(name: &CString) -> io::Result<()> {
    if unsafe { libc::shm_unlink(name.as_ptr()) } == -1 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

fn access_flags(access: AccessMode) -> libc::c_int {
    match access {
        AccessMode::ReadOnly => libc::O_RDONLY,
        AccessMode::ReadWrite => libc::O_RDWR,
    }
}

fn current_size(file: &File, name: &SegmentName) -> ShmResult<usize> {
    let metadata = file
        .metadata()
        .map_err(|e| ShmError::os(format!("fstat('{}')", name), e))?;

    usize::try_from(metadata.len()).map_err(|_| {
        ShmError::with_message(
            ErrorCode::InvalidSize,
            format!(
                "segment '{}' is {} bytes, more than this process can map",
                name,
                metadata.len()
            ),
        )
    })
}

/// Settle the backing size and return the size every opener will observe
fn establish_size(
    file: &File,
    name: &SegmentName,
    size: usize,
    mode: CreateMode,
    creator: bool,
) -> ShmResult<usize> {
    // A fresh object, ours or a racing creator's that is not sized yet.
    // It is only ever grown, so no mapping loses its tail.
    let existing = current_size(file, name)?;
    if creator || existing == 0 {
        if existing < size {
            file.set_len(size as u64)
                .map_err(|e| ShmError::os(format!("ftruncate('{}', {})", name, size), e))?;
        }
        return current_size(file, name);
    }

    match mode {
        // Live segments are never resized; a bigger one needs a new identity
        CreateMode::OpenAlways if existing < size => Err(ShmError::with_message(
            ErrorCode::SizeMismatch,
            format!(
                "cannot grow existing segment '{}' from {} to {} bytes",
                name, existing, size
            ),
        )),
        CreateMode::OpenAlways if existing > size => {
            // Shrinking could fault other processes still mapping the tail
            log::warn!(
                "open_always: keeping existing size of '{}' ({} bytes) instead of truncating to {} bytes",
                name,
                existing,
                size
            );
            Ok(existing)
        }
        _ => Ok(existing),
    }
}

fn map_file(file: &File, name: &SegmentName, size: usize, access: AccessMode) -> ShmResult<Mapping> {
    if size == 0 {
        return Err(ShmError::with_message(
            ErrorCode::MappingFailed,
            format!("segment '{}' has no backing size yet", name),
        ));
    }

    let mut options = MmapOptions::new();
    options.len(size);

    // Both mappings are MAP_SHARED over the shm descriptor; other processes
    // may change the bytes underneath us, which callers accept by using shm.
    let mapped = match access {
        AccessMode::ReadOnly => unsafe { options.map(file) }.map(Mapping::ReadOnly),
        AccessMode::ReadWrite => unsafe { options.map_mut(file) }.map(Mapping::ReadWrite),
    };

    mapped.map_err(|e| {
        let code = match ErrorCode::from_os_error(&e) {
            ErrorCode::Unknown | ErrorCode::InvalidArgument => ErrorCode::MappingFailed,
            code => code,
        };
        ShmError::os_with_code(code, format!("mmap('{}', {} bytes)", name, size), e)
    })
}

impl PosixSharedMemory {
    fn install(&mut self, file: File, mut mapping: Mapping, size: usize, creator: bool) {
        self.ptr = match &mut mapping {
            Mapping::ReadOnly(map) => map.as_ptr() as *mut u8,
            Mapping::ReadWrite(map) => map.as_mut_ptr(),
        };
        self.file = Some(file);
        self.mapping = Some(mapping);
        self.size = size;
        self.creator = creator;
    }
}

impl SharedMemoryBackend for PosixSharedMemory {
    fn create(
        &mut self,
        name: &SegmentName,
        size: usize,
        mode: CreateMode,
        access: AccessMode,
        permissions: u32,
    ) -> ShmResult<()> {
        if mode == CreateMode::OpenExisting {
            return self.open(name, access);
        }
        if size == 0 {
            return Err(ShmError::invalid_size(size));
        }

        self.close();
        self.creator = false;
        let os_name = name.to_c_string()?;

        // Creation always opens read-write so the new object can be sized;
        // the mapping below still honours `access`.
        let exclusive = libc::O_CREAT | libc::O_EXCL | libc::O_RDWR;
        let (file, creator) = match shm_open(&os_name, exclusive, permissions) {
            Ok(file) => (file, true),
            Err(e) if mode != CreateMode::CreateOnly && e.raw_os_error() == Some(libc::EEXIST) => {
                // Read-write if we may, so a still-unsized object can be sized
                let file = match shm_open(&os_name, libc::O_RDWR, 0) {
                    Err(e) if e.raw_os_error() == Some(libc::EACCES) && !access.is_writable() => {
                        shm_open(&os_name, libc::O_RDONLY, 0)
                    }
                    opened => opened,
                }
                .map_err(|e| ShmError::os(format!("shm_open('{}')", name), e))?;
                (file, false)
            }
            Err(e) => return Err(ShmError::os(format!("shm_open('{}')", name), e)),
        };

        let mapped = establish_size(&file, name, size, mode, creator)
            .and_then(|granted| Ok((granted, map_file(&file, name, granted, access)?)));

        match mapped {
            Ok((granted, mapping)) => {
                self.install(file, mapping, granted, creator);
                Ok(())
            }
            Err(err) => {
                drop(file);
                if creator {
                    if let Err(e) = shm_unlink(&os_name) {
                        log::debug!("failed to unlink half-created segment '{}': {}", name, e);
                    }
                }
                Err(err)
            }
        }
    }

    fn open(&mut self, name: &SegmentName, access: AccessMode) -> ShmResult<()> {
        self.close();
        self.creator = false;
        let os_name = name.to_c_string()?;

        let file = shm_open(&os_name, access_flags(access), 0)
            .map_err(|e| ShmError::os(format!("shm_open('{}')", name), e))?;

        let size = current_size(&file, name)?;
        let mapping = map_file(&file, name, size, access)?;
        self.install(file, mapping, size, false);
        Ok(())
    }

    fn unmap(&mut self) {
        if self.mapping.take().is_some() {
            log::debug!("unmapped {} bytes at {:p}", self.size, self.ptr);
        }
        self.ptr = std::ptr::null_mut();
    }

    fn close(&mut self) {
        self.unmap();
        self.file = None;
        self.size = 0;
    }

    fn data(&self) -> *mut u8 {
        self.ptr
    }

    fn size(&self) -> usize {
        self.size
    }

    fn is_creator(&self) -> bool {
        self.creator
    }

    fn remove(name: &SegmentName) -> bool {
        let Ok(os_name) = name.to_c_string() else {
            return false;
        };

        match shm_unlink(&os_name) {
            Ok(()) => {
                log::debug!("unlinked shared memory '{}'", name);
                true
            }
            Err(e) => {
                log::debug!("shm_unlink('{}') failed: {}", name, e);
                false
            }
        }
    }

    fn exists(name: &SegmentName) -> bool {
        let Ok(os_name) = name.to_c_string() else {
            return false;
        };

        match shm_open(&os_name, libc::O_RDONLY, 0) {
            Ok(_file) => true,
            // Present, just not readable by us
            Err(e) => e.raw_os_error() == Some(libc::EACCES),
        }
    }

    fn granularity() -> usize {
        let page = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        if page > 0 {
            page as usize
        } else {
            4096
        }
    }
}

impl Drop for PosixSharedMemory {
    fn drop(&mut self) {
        self.close();
    }
}
