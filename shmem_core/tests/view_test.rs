// Test non-owning views, including cross-thread synchronisation through the region
mod common;

use common::Cleanup;
use shmem_core::{AccessMode, SharedMemory, SharedMemoryView};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::{Duration, Instant};

/// Layout placed at the start of the shared region
#[repr(C)]
struct SharedData {
    counter: AtomicU32,
    done: AtomicBool,
    message: [u8; 256],
}

#[test]
fn test_view_mirrors_owner() {
    let guard = Cleanup::new("view_mirror");
    let shm = SharedMemory::create_only(guard.name(), 1024).unwrap();

    let view = shm.view();
    assert!(view.is_valid());
    assert_eq!(view.data(), shm.data());
    assert_eq!(view.size(), shm.size());
    assert_eq!(view.name(), guard.name());
    assert_eq!(view.mode(), AccessMode::ReadWrite);

    let copy = view.clone();
    assert_eq!(copy.data(), view.data());

    let converted = SharedMemoryView::from(&shm);
    assert_eq!(converted.size(), shm.size());
}

#[test]
fn test_view_writes_are_visible_to_other_mappings() {
    let guard = Cleanup::new("view_write");
    let writer = SharedMemory::create_only(guard.name(), 128).unwrap();
    let reader = SharedMemory::open_existing(guard.name(), AccessMode::ReadOnly).unwrap();

    let view = writer.view();
    unsafe { view.as_mut_slice().unwrap()[..4].copy_from_slice(b"ping") };
    assert_eq!(&reader.as_slice().unwrap()[..4], b"ping");

    assert!(unsafe { reader.view().as_mut_slice() }.is_none());
}

#[test]
fn test_view_cast_checks_fit() {
    let guard = Cleanup::new("view_cast");
    let shm = SharedMemory::create_only(guard.name(), 64).unwrap();
    let view = shm.view();

    assert!(view.cast::<u64>().is_some());
    assert!(view.cast::<[u8; 64]>().is_some());
    assert!(view.cast::<[u8; 1 << 20]>().is_none());
}

#[test]
fn test_threads_synchronise_through_atomics() {
    const ITERATIONS: u32 = 100;

    let guard = Cleanup::new("view_sync");
    let shm = SharedMemory::create_only(guard.name(), std::mem::size_of::<SharedData>()).unwrap();
    let view = shm.view();
    let shared = view.cast::<SharedData>().unwrap();

    std::thread::scope(|scope| {
        let writer_view = view.clone();
        scope.spawn(move || {
            let data = unsafe { writer_view.cast::<SharedData>().unwrap().as_ref() };
            for _ in 0..ITERATIONS {
                data.counter.fetch_add(1, Ordering::Release);
            }
            data.done.store(true, Ordering::Release);
        });

        let reader_view = view.clone();
        let reader = scope.spawn(move || {
            let data = unsafe { reader_view.cast::<SharedData>().unwrap().as_ref() };
            let deadline = Instant::now() + Duration::from_secs(10);
            while !data.done.load(Ordering::Acquire) {
                assert!(Instant::now() < deadline, "writer never finished");
                std::thread::yield_now();
            }
            data.counter.load(Ordering::Acquire)
        });

        assert_eq!(reader.join().unwrap(), ITERATIONS);
    });

    let data = unsafe { shared.as_ref() };
    assert_eq!(data.counter.load(Ordering::Acquire), ITERATIONS);
    assert!(data.message.iter().all(|&b| b == 0));
}

#[test]
fn test_view_of_closed_owner_is_invalid_when_retaken() {
    let guard = Cleanup::new("view_closed");
    let mut shm = SharedMemory::create_only(guard.name(), 64).unwrap();
    let before = shm.view();
    shm.close();

    // Existing views are not told; a new one reflects the closed state
    assert!(before.is_valid());
    let after = shm.view();
    assert!(!after.is_valid());
    assert_eq!(after.size(), 0);
}
