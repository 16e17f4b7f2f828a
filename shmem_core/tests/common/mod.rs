// Shared helpers for shmem_core integration tests
#![allow(dead_code)]

use shmem_core::SharedMemory;

/// Short unique name; stays within the 30-character portable limit for prefixes up to 21 chars
pub fn unique_name(prefix: &str) -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("{}_{}", prefix, &id[..8])
}

/// Removes the named segment when dropped
pub struct Cleanup(pub String);

impl Cleanup {
    pub fn new(prefix: &str) -> Self {
        Cleanup(unique_name(prefix))
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl Drop for Cleanup {
    fn drop(&mut self) {
        SharedMemory::remove(&self.0);
    }
}
