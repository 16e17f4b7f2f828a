// Windows shared memory backend: CreateFileMappingW + MapViewOfFile
//
// Mappings are backed by the paging file and named in the session's kernel
// object namespace. The kernel frees an identity when its last handle closes,
// so there is nothing to unlink.
use super::name::SegmentName;
use super::platform::SharedMemoryBackend;
use super::types::{AccessMode, CreateMode};
use crate::error::{ErrorCode, ShmError, ShmResult};
use std::io;
use std::mem::{size_of, MaybeUninit};
use windows_sys::Win32::Foundation::{
    CloseHandle, GetLastError, ERROR_ACCESS_DENIED, ERROR_ALREADY_EXISTS, HANDLE,
    INVALID_HANDLE_VALUE,
};
use windows_sys::Win32::System::Memory::{
    CreateFileMappingW, MapViewOfFile, OpenFileMappingW, UnmapViewOfFile, VirtualQuery, FILE_MAP,
    FILE_MAP_READ, FILE_MAP_WRITE, MEMORY_BASIC_INFORMATION, MEMORY_MAPPED_VIEW_ADDRESS,
    PAGE_READWRITE,
};
use windows_sys::Win32::System::SystemInformation::{GetSystemInfo, SYSTEM_INFO};

/// Named file mapping backed by the paging file
#[derive(Debug)]
pub struct WindowsSharedMemory {
    handle: Option<HANDLE>,
    view: *mut u8,
    size: usize,
    creator: bool,
}

// The view is owned exclusively by this struct and released in `unmap`.
unsafe impl Send for WindowsSharedMemory {}

impl Default for WindowsSharedMemory {
    fn default() -> Self {
        Self {
            handle: None,
            view: std::ptr::null_mut(),
            size: 0,
            creator: false,
        }
    }
}

fn map_access(access: AccessMode) -> FILE_MAP {
    match access {
        AccessMode::ReadOnly => FILE_MAP_READ,
        AccessMode::ReadWrite => FILE_MAP_READ | FILE_MAP_WRITE,
    }
}

impl WindowsSharedMemory {
    /// Map the whole section and record the size the kernel actually granted
    fn map(&mut self, name: &SegmentName, access: AccessMode) -> ShmResult<()> {
        let Some(handle) = self.handle else {
            return Err(ShmError::with_message(
                ErrorCode::MappingFailed,
                format!("no open handle for '{}'", name),
            ));
        };

        let view = unsafe { MapViewOfFile(handle, map_access(access), 0, 0, 0) };
        if view.Value.is_null() {
            let e = io::Error::last_os_error();
            let code = match ErrorCode::from_os_error(&e) {
                ErrorCode::Unknown | ErrorCode::InvalidArgument => ErrorCode::MappingFailed,
                code => code,
            };
            return Err(ShmError::os_with_code(
                code,
                format!("MapViewOfFile('{}')", name),
                e,
            ));
        }

        // The view is rounded up to whole pages; report what was granted
        let mut info = MaybeUninit::<MEMORY_BASIC_INFORMATION>::zeroed();
        let written = unsafe {
            VirtualQuery(
                view.Value,
                info.as_mut_ptr(),
                size_of::<MEMORY_BASIC_INFORMATION>(),
            )
        };
        if written == 0 {
            let e = io::Error::last_os_error();
            unsafe { UnmapViewOfFile(view) };
            return Err(ShmError::os_with_code(
                ErrorCode::MappingFailed,
                format!("VirtualQuery('{}')", name),
                e,
            ));
        }
        let info = unsafe { info.assume_init() };

        self.view = view.Value.cast();
        self.size = info.RegionSize;
        Ok(())
    }
}

impl SharedMemoryBackend for WindowsSharedMemory {
    fn create(
        &mut self,
        name: &SegmentName,
        size: usize,
        mode: CreateMode,
        access: AccessMode,
        _permissions: u32,
    ) -> ShmResult<()> {
        if mode == CreateMode::OpenExisting {
            return self.open(name, access);
        }
        if size == 0 {
            return Err(ShmError::invalid_size(size));
        }

        self.close();
        self.creator = false;
        let wide = name.to_wide();
        let size64 = size as u64;

        // The section is always created writable; the view honours `access`
        let handle = unsafe {
            CreateFileMappingW(
                INVALID_HANDLE_VALUE,
                std::ptr::null(),
                PAGE_READWRITE,
                (size64 >> 32) as u32,
                size64 as u32,
                wide.as_ptr(),
            )
        };
        if handle == 0 {
            return Err(ShmError::last_os_error(format!(
                "CreateFileMappingW('{}', {})",
                name, size
            )));
        }

        // A valid handle plus ERROR_ALREADY_EXISTS means we joined an existing section
        let existed = unsafe { GetLastError() } == ERROR_ALREADY_EXISTS;
        if existed && mode == CreateMode::CreateOnly {
            unsafe { CloseHandle(handle) };
            return Err(ShmError::with_message(
                ErrorCode::AlreadyExists,
                format!("{}: '{}'", ErrorCode::AlreadyExists.message(), name),
            ));
        }

        self.handle = Some(handle);
        self.creator = !existed;

        if let Err(err) = self.map(name, access) {
            // Closing the last handle also destroys a section we just created
            self.close();
            return Err(err);
        }

        // Sections cannot grow once created
        if existed && mode == CreateMode::OpenAlways && self.size < size {
            let granted = self.size;
            self.close();
            return Err(ShmError::with_message(
                ErrorCode::SizeMismatch,
                format!(
                    "cannot grow existing segment '{}' from {} to {} bytes",
                    name, granted, size
                ),
            ));
        }

        Ok(())
    }

    fn open(&mut self, name: &SegmentName, access: AccessMode) -> ShmResult<()> {
        self.close();
        self.creator = false;
        let wide = name.to_wide();

        let handle = unsafe { OpenFileMappingW(map_access(access), 0, wide.as_ptr()) };
        if handle == 0 {
            return Err(ShmError::last_os_error(format!(
                "OpenFileMappingW('{}')",
                name
            )));
        }
        self.handle = Some(handle);

        if let Err(err) = self.map(name, access) {
            self.close();
            return Err(err);
        }
        Ok(())
    }

    fn unmap(&mut self) {
        if !self.view.is_null() {
            let view = MEMORY_MAPPED_VIEW_ADDRESS {
                Value: self.view.cast(),
            };
            unsafe { UnmapViewOfFile(view) };
            log::debug!("unmapped {} bytes at {:p}", self.size, self.view);
            self.view = std::ptr::null_mut();
        }
    }

    fn close(&mut self) {
        self.unmap();
        if let Some(handle) = self.handle.take() {
            unsafe { CloseHandle(handle) };
        }
        self.size = 0;
    }

    fn data(&self) -> *mut u8 {
        self.view
    }

    fn size(&self) -> usize {
        self.size
    }

    fn is_creator(&self) -> bool {
        self.creator
    }

    fn remove(name: &SegmentName) -> bool {
        log::debug!(
            "remove('{}') is a no-op: the kernel frees sections with their last handle",
            name
        );
        true
    }

    fn exists(name: &SegmentName) -> bool {
        let wide = name.to_wide();
        let handle = unsafe { OpenFileMappingW(FILE_MAP_READ, 0, wide.as_ptr()) };
        if handle != 0 {
            unsafe { CloseHandle(handle) };
            return true;
        }

        // Present, just not readable by us
        unsafe { GetLastError() == ERROR_ACCESS_DENIED }
    }

    fn granularity() -> usize {
        let mut info = MaybeUninit::<SYSTEM_INFO>::zeroed();
        let info = unsafe {
            GetSystemInfo(info.as_mut_ptr());
            info.assume_init()
        };
        info.dwAllocationGranularity as usize
    }
}

impl Drop for WindowsSharedMemory {
    fn drop(&mut self) {
        self.close();
    }
}
