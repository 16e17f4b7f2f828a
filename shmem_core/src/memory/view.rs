use super::shared_memory::SharedMemory;
use super::types::AccessMode;
use std::mem::{align_of, size_of};
use std::ptr::NonNull;

/// Non-owning snapshot of a mapping: address, size, name and access mode
///
/// A view is cheap to clone and can be handed to other threads. It does not
/// keep the mapping alive and is not told when the source closes, so the
/// owning [`SharedMemory`] must outlive every view taken from it.
#[derive(Debug, Clone)]
pub struct SharedMemoryView {
    data: *mut u8,
    size: usize,
    name: String,
    mode: AccessMode,
}

// A view is plain data; dereferencing it is already unsafe.
unsafe impl Send for SharedMemoryView {}
unsafe impl Sync for SharedMemoryView {}

impl Default for SharedMemoryView {
    fn default() -> Self {
        Self {
            data: std::ptr::null_mut(),
            size: 0,
            name: String::new(),
            mode: AccessMode::ReadWrite,
        }
    }
}

impl SharedMemoryView {
    /// Describe a region from raw parts
    pub fn from_raw(data: *mut u8, size: usize, name: &str, mode: AccessMode) -> Self {
        Self {
            data,
            size,
            name: name.to_string(),
            mode,
        }
    }

    pub fn data(&self) -> *mut u8 {
        self.data
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    /// Whether the view had a non-null address when it was taken
    pub fn is_valid(&self) -> bool {
        !self.data.is_null()
    }

    /// Borrow the viewed bytes
    ///
    /// # Safety
    ///
    /// The mapping this view was taken from must still be alive for the
    /// returned lifetime.
    pub unsafe fn as_slice(&self) -> Option<&[u8]> {
        if !self.is_valid() {
            return None;
        }
        Some(std::slice::from_raw_parts(self.data, self.size))
    }

    /// Mutably borrow the viewed bytes, `None` for read-only views
    ///
    /// # Safety
    ///
    /// The mapping must still be alive, and no other reference to the same
    /// bytes may exist for the returned lifetime.
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn as_mut_slice(&self) -> Option<&mut [u8]> {
        if !self.is_valid() || !self.mode.is_writable() {
            return None;
        }
        Some(std::slice::from_raw_parts_mut(self.data, self.size))
    }

    /// Pointer to a `T` at the start of the region, if it fits and is aligned
    pub fn cast<T>(&self) -> Option<NonNull<T>> {
        if size_of::<T>() > self.size || (self.data as usize) % align_of::<T>() != 0 {
            return None;
        }
        NonNull::new(self.data.cast::<T>())
    }
}

impl From<&SharedMemory> for SharedMemoryView {
    fn from(shm: &SharedMemory) -> Self {
        Self {
            data: shm.data(),
            size: shm.size(),
            name: shm.name().to_string(),
            mode: shm.mode(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_view_is_invalid() {
        let view = SharedMemoryView::default();
        assert!(!view.is_valid());
        assert_eq!(view.size(), 0);
        assert_eq!(view.name(), "");
        assert!(unsafe { view.as_slice() }.is_none());
        assert!(view.cast::<u64>().is_none());
    }

    #[test]
    fn test_raw_view_over_local_buffer() {
        let mut buffer = [0u64; 4];
        let view = SharedMemoryView::from_raw(
            buffer.as_mut_ptr().cast(),
            std::mem::size_of_val(&buffer),
            "local",
            AccessMode::ReadWrite,
        );
        let copy = view.clone();

        unsafe { copy.as_mut_slice().unwrap()[0] = 0xAB };
        assert_eq!(unsafe { view.as_slice().unwrap()[0] }, 0xAB);
        assert_eq!(copy.name(), "local");
        assert_eq!(copy.size(), 32);
        assert!(view.cast::<[u64; 4]>().is_some());
        assert!(view.cast::<[u64; 5]>().is_none());
    }

    #[test]
    fn test_read_only_view_refuses_mutation() {
        let mut buffer = [0u8; 8];
        let view =
            SharedMemoryView::from_raw(buffer.as_mut_ptr(), 8, "ro", AccessMode::ReadOnly);
        assert!(unsafe { view.as_mut_slice() }.is_none());
        assert!(unsafe { view.as_slice() }.is_some());
    }

    #[test]
    fn test_view_of_invalid_segment() {
        let shm = SharedMemory::default();
        let view = shm.view();
        assert!(!view.is_valid());
        assert_eq!(view.mode(), AccessMode::ReadWrite);
    }
}
