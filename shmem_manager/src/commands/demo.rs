// In-process writer/reader pair sharing one segment through views
use anyhow::{bail, Context, Result};
use shmem_core::{SharedMemory, SharedMemoryView};
use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::{Duration, Instant};

pub const MESSAGE_CAPACITY: usize = 256;

/// Layout both threads agree on, placed at the start of the segment
#[repr(C)]
pub struct SharedData {
    pub counter: AtomicU32,
    pub done: AtomicBool,
    /// Written once by the writer before `done`, read after it
    pub message: UnsafeCell<[u8; MESSAGE_CAPACITY]>,
}

/// What the reader thread observed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemoReport {
    pub iterations: u32,
    pub observed: u32,
    pub message: String,
}

fn shared_data(view: &SharedMemoryView) -> Result<&SharedData> {
    let ptr = view
        .cast::<SharedData>()
        .with_context(|| format!("segment '{}' cannot hold the demo layout", view.name()))?;
    // The owning SharedMemory outlives both threads (scoped below)
    Ok(unsafe { ptr.as_ref() })
}

fn writer(view: SharedMemoryView, iterations: u32, interval: Duration) -> Result<()> {
    let data = shared_data(&view)?;
    for i in 1..=iterations {
        data.counter.store(i, Ordering::Release);
        if !interval.is_zero() {
            std::thread::sleep(interval);
        }
    }

    // The message is written before `done` is published, so the reader sees it whole
    let text = format!("writer finished after {} iterations", iterations);
    let message = unsafe { &mut *data.message.get() };
    let len = text.len().min(MESSAGE_CAPACITY - 1);
    message[..len].copy_from_slice(&text.as_bytes()[..len]);
    message[len] = 0;
    data.done.store(true, Ordering::Release);
    Ok(())
}

fn reader(view: SharedMemoryView, timeout: Duration) -> Result<(u32, String)> {
    let data = shared_data(&view)?;
    let deadline = Instant::now() + timeout;
    let mut last_seen = 0;

    while !data.done.load(Ordering::Acquire) {
        let current = data.counter.load(Ordering::Acquire);
        if current != last_seen {
            tracing::debug!("reader observed counter {}", current);
            last_seen = current;
        }
        if Instant::now() > deadline {
            bail!("writer did not finish within {:?}", timeout);
        }
        std::thread::yield_now();
    }

    let bytes = unsafe { &*data.message.get() };
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(MESSAGE_CAPACITY);
    let message = String::from_utf8_lossy(&bytes[..end]).into_owned();
    Ok((data.counter.load(Ordering::Acquire), message))
}

/// Run the writer and reader threads against a fresh segment named `name`.
///
/// The segment is created exclusively and removed again afterwards.
pub fn run(name: &str, iterations: u32, interval: Duration) -> Result<DemoReport> {
    let shm = SharedMemory::create_only(name, std::mem::size_of::<SharedData>())
        .with_context(|| format!("failed to create demo segment '{}'", name))?;
    tracing::info!("demo segment '{}' mapped ({} bytes)", name, shm.size());

    let view = shm.view();
    let timeout = interval * iterations + Duration::from_secs(10);

    let outcome = std::thread::scope(|scope| {
        let writer_view = view.clone();
        let writer_handle = scope.spawn(move || writer(writer_view, iterations, interval));
        let reader_handle = scope.spawn(move || reader(view, timeout));

        let read = reader_handle.join();
        let written = writer_handle.join();
        match (written, read) {
            (Ok(w), Ok(r)) => w.and(r),
            _ => bail!("demo thread panicked"),
        }
    });

    drop(shm);
    SharedMemory::remove(name);

    let (observed, message) = outcome?;
    Ok(DemoReport {
        iterations,
        observed,
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_round() {
        let name = format!("mgr_demo_{}", std::process::id());
        let report = run(&name, 25, Duration::ZERO).unwrap();

        assert_eq!(report.observed, 25);
        assert_eq!(report.message, "writer finished after 25 iterations");
        assert!(!SharedMemory::exists(&name));
    }

    #[test]
    fn test_layout_fits_message() {
        assert!(std::mem::size_of::<SharedData>() >= MESSAGE_CAPACITY + 5);
    }
}
