use anyhow::{bail, Context, Result};
use serde::Serialize;
use shmem_core::{AccessMode, CreateMode, Discipline, Platform, SharedMemory, ShmConfig};
use std::time::Duration;

/// Default size used by `write` when the segment does not exist yet
pub const DEFAULT_WRITE_SIZE: usize = 4096;

/// What a command learned about a mapped segment
#[derive(Debug, Clone, Serialize)]
pub struct SegmentInfo {
    pub name: String,
    pub size: usize,
    pub access: AccessMode,
    pub creator: bool,
    pub platform: String,
}

impl SegmentInfo {
    fn of(shm: &SharedMemory) -> Self {
        Self {
            name: shm.name().to_string(),
            size: shm.size(),
            access: shm.mode(),
            creator: shm.is_creator(),
            platform: Platform::current().to_string(),
        }
    }
}

/// Config for commands that must fail loudly regardless of the file's discipline
fn fail_fast(config: &ShmConfig, access: AccessMode) -> ShmConfig {
    ShmConfig {
        access,
        discipline: Discipline::FailFast,
        ..config.clone()
    }
}

/// Create (or open, depending on `mode`) a segment and report it.
///
/// The mapping is released before returning. On POSIX the identity persists
/// until `remove`; on Windows it vanishes with this process.
pub fn create(
    name: &str,
    size: usize,
    mode: CreateMode,
    read_only: bool,
    config: &ShmConfig,
) -> Result<SegmentInfo> {
    let access = if read_only {
        AccessMode::ReadOnly
    } else {
        AccessMode::ReadWrite
    };
    let shm = SharedMemory::with_config(name, Some(size), mode, &fail_fast(config, access))
        .with_context(|| format!("failed to {} '{}'", mode, name))?;

    Ok(SegmentInfo::of(&shm))
}

/// Write `text` as a NUL-terminated string at `offset`, creating the segment if needed.
///
/// With `hold` the mapping stays alive for that long after writing, which is
/// what keeps a Windows segment reachable for readers in other processes.
pub fn write(
    name: &str,
    text: &str,
    size: usize,
    offset: usize,
    hold: Option<Duration>,
    config: &ShmConfig,
) -> Result<SegmentInfo> {
    let mut shm = SharedMemory::with_config(
        name,
        Some(size),
        CreateMode::OpenOrCreate,
        &fail_fast(config, AccessMode::ReadWrite),
    )
    .with_context(|| format!("failed to open or create '{}'", name))?;

    let info = SegmentInfo::of(&shm);
    let Some(bytes) = shm.as_mut_slice() else {
        bail!("segment '{}' is not writable", name);
    };

    // Index of the terminating NUL, if it fits
    let Some(end) = offset.checked_add(text.len()).filter(|&end| end < bytes.len()) else {
        bail!(
            "'{}' needs {} bytes at offset {} but segment '{}' holds {}",
            text,
            text.len() + 1,
            offset,
            name,
            bytes.len()
        );
    };

    bytes[offset..end].copy_from_slice(text.as_bytes());
    bytes[end] = 0;
    tracing::debug!("wrote {} bytes to '{}' at offset {}", text.len() + 1, name, offset);

    if let Some(hold) = hold {
        tracing::info!("holding '{}' open for {:?}", name, hold);
        std::thread::sleep(hold);
    }

    Ok(info)
}

/// Read the NUL-terminated string stored at `offset` of an existing segment
pub fn read(name: &str, offset: usize, config: &ShmConfig) -> Result<String> {
    let shm = SharedMemory::with_config(
        name,
        None,
        CreateMode::OpenExisting,
        &fail_fast(config, AccessMode::ReadOnly),
    )
    .with_context(|| format!("failed to open '{}'", name))?;

    let bytes = shm.as_slice().unwrap_or_default();
    if offset >= bytes.len() {
        bail!(
            "offset {} is past the end of segment '{}' ({} bytes)",
            offset,
            name,
            bytes.len()
        );
    }

    Ok(c_string_at(bytes, offset))
}

fn c_string_at(bytes: &[u8], offset: usize) -> String {
    let tail = &bytes[offset..];
    let end = tail.iter().position(|&b| b == 0).unwrap_or(tail.len());
    String::from_utf8_lossy(&tail[..end]).into_owned()
}

/// Open an existing segment read-only and describe it
pub fn info(name: &str, config: &ShmConfig) -> Result<SegmentInfo> {
    let shm = SharedMemory::with_config(
        name,
        None,
        CreateMode::OpenExisting,
        &fail_fast(config, AccessMode::ReadOnly),
    )
    .with_context(|| format!("failed to open '{}'", name))?;

    Ok(SegmentInfo::of(&shm))
}

pub fn exists(name: &str) -> bool {
    SharedMemory::exists(name)
}

pub fn remove(name: &str) -> bool {
    SharedMemory::remove(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_name(tag: &str) -> String {
        format!("mgr_{}_{}", tag, std::process::id())
    }

    #[test]
    fn test_c_string_at() {
        let bytes = b"hello\0world\0\0";
        assert_eq!(c_string_at(bytes, 0), "hello");
        assert_eq!(c_string_at(bytes, 6), "world");
        assert_eq!(c_string_at(bytes, 12), "");
        assert_eq!(c_string_at(b"unterminated", 2), "terminated");
    }

    #[test]
    fn test_write_then_read() {
        let name = test_name("rw");
        let config = ShmConfig::default();

        let written = write(&name, "hello", 256, 0, None, &config);
        // Windows drops the section with the writer's mapping
        if Platform::current().requires_manual_removal() {
            let info = written.unwrap();
            assert!(info.creator);
            assert_eq!(info.size, 256);

            assert_eq!(read(&name, 0, &config).unwrap(), "hello");
            assert_eq!(read(&name, 2, &config).unwrap(), "llo");
            assert!(read(&name, 256, &config).is_err());
            assert!(remove(&name));
        } else {
            assert!(written.is_ok());
        }
    }

    #[test]
    fn test_write_rejects_overflow() {
        let name = test_name("overflow");
        let err = write(&name, "too long for this", 8, 0, None, &ShmConfig::default()).unwrap_err();
        assert!(err.to_string().contains("needs 18 bytes"), "{}", err);
        remove(&name);
    }

    #[test]
    fn test_write_rejects_offset_past_address_space() {
        let name = test_name("far_offset");
        let err = write(&name, "x", 64, usize::MAX, None, &ShmConfig::default()).unwrap_err();
        assert!(err.to_string().contains("needs 2 bytes"), "{}", err);
        remove(&name);
    }

    #[test]
    fn test_read_only_config_does_not_block_writes() {
        let name = test_name("ro_cfg");
        let config = ShmConfig {
            access: AccessMode::ReadOnly,
            discipline: Discipline::FailSoft,
            ..ShmConfig::default()
        };
        assert!(write(&name, "x", 64, 0, None, &config).is_ok());
        remove(&name);
    }

    #[test]
    fn test_missing_segment_reports_not_found() {
        let name = test_name("missing");
        let err = info(&name, &ShmConfig::default()).unwrap_err();
        let shm_err = err.downcast_ref::<shmem_core::ShmError>().unwrap();
        assert_eq!(shm_err.code(), shmem_core::ErrorCode::NotFound);
        assert!(!exists(&name));
    }
}
