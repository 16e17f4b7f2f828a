// Test ownership transfer and release of mappings
mod common;

use common::Cleanup;
use shmem_core::{AccessMode, SharedMemory};

#[test]
fn test_take_transfers_everything() {
    let guard = Cleanup::new("move_take");

    let mut original = SharedMemory::create_only(guard.name(), 1024).unwrap();
    original.as_mut_slice().unwrap()[0] = 42;
    let data = original.data();
    let size = original.size();

    let moved = original.take();

    assert!(moved.is_valid());
    assert_eq!(moved.data(), data);
    assert_eq!(moved.size(), size);
    assert_eq!(moved.name(), guard.name());
    assert_eq!(moved.mode(), AccessMode::ReadWrite);
    assert!(moved.is_creator());
    assert_eq!(moved.as_slice().unwrap()[0], 42);

    assert!(!original.is_valid());
    assert!(original.data().is_null());
    assert_eq!(original.size(), 0);
    assert!(!original.is_creator());
    assert!(original.as_slice().is_none());
}

#[test]
fn test_mem_take_matches_take() {
    let guard = Cleanup::new("move_memtake");

    let mut original = SharedMemory::create_only(guard.name(), 512).unwrap();
    let moved = std::mem::take(&mut original);
    assert!(moved.is_valid());
    assert!(!original.is_valid());
}

#[test]
fn test_plain_move_keeps_mapping() {
    let guard = Cleanup::new("move_plain");

    let shm = SharedMemory::create_only(guard.name(), 512).unwrap();
    let data = shm.data();
    let boxed = Box::new(shm);
    assert_eq!(boxed.data(), data);
    assert!(boxed.is_valid());
}

#[test]
fn test_assignment_releases_previous_mapping() {
    let first = Cleanup::new("move_assign_a");
    let second = Cleanup::new("move_assign_b");

    let mut target = SharedMemory::create_only(first.name(), 256).unwrap();
    let mut source = SharedMemory::create_only(second.name(), 512).unwrap();
    let source_data = source.data();
    assert!(target.is_creator());

    target = source.take();

    assert_eq!(target.data(), source_data);
    assert_eq!(target.name(), second.name());
    assert!(!source.is_valid());

    // The first identity is still reachable by name; only our mapping went away
    assert!(SharedMemory::exists(first.name()));
    let reopened = SharedMemory::open_existing(first.name(), AccessMode::ReadOnly).unwrap();
    assert!(reopened.size() >= 256);
}

#[test]
fn test_self_take_leaves_valid_state() {
    let guard = Cleanup::new("move_self");

    let mut shm = SharedMemory::create_only(guard.name(), 128).unwrap();
    let data = shm.data();
    shm = shm.take();
    assert!(shm.is_valid());
    assert_eq!(shm.data(), data);
}

#[test]
fn test_unmap_then_close() {
    let guard = Cleanup::new("move_unmap");

    let mut shm = SharedMemory::create_only(guard.name(), 1024).unwrap();
    shm.unmap();
    assert!(!shm.is_valid());
    assert!(shm.data().is_null());
    assert!(shm.as_slice().is_none());

    shm.unmap();
    shm.close();
    shm.close();
    assert!(!shm.is_valid());
    assert_eq!(shm.size(), 0);
}

#[test]
fn test_close_keeps_identity() {
    let guard = Cleanup::new("move_close");

    let mut writer = SharedMemory::create_only(guard.name(), 64).unwrap();
    writer.as_mut_slice().unwrap()[..3].copy_from_slice(b"abc");

    // Keep a second mapping alive so the Windows section survives the close
    let reader = SharedMemory::open_existing(guard.name(), AccessMode::ReadOnly).unwrap();
    writer.close();
    assert!(!writer.is_valid());

    assert!(SharedMemory::exists(guard.name()));
    assert_eq!(&reader.as_slice().unwrap()[..3], b"abc");
}
