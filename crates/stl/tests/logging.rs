//! Log levels of recoverable and unrecoverable exhaustion.
#![cfg(feature = "logging")]

use std::io;
use std::sync::{Arc, Mutex};

use nebula_stl::allocator::{BudgetAllocator, MemoryBudget, PoolAllocator, PoolConfig};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Clone, Default)]
struct Capture(Arc<Mutex<Vec<u8>>>);

impl Capture {
    fn text(&self) -> String {
        let bytes = self.0.lock().map(|buf| buf.clone()).unwrap_or_default();
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl io::Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if let Ok(mut inner) = self.0.lock() {
            inner.extend_from_slice(buf);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn capture_logs<R>(run: impl FnOnce() -> R) -> (R, String) {
    let capture = Capture::default();
    let writer = capture.clone();
    let _guard = tracing_subscriber::fmt()
        .with_max_level(LevelFilter::TRACE)
        .with_writer(move || writer.clone())
        .finish()
        .set_default();
    let result = run();
    (result, capture.text())
}

fn budgeted_pool(limit: usize) -> PoolAllocator<BudgetAllocator> {
    let raw = BudgetAllocator::new(MemoryBudget::new(limit));
    PoolAllocator::with_allocator(raw, PoolConfig::production()).unwrap()
}

#[test]
fn test_scavenged_allocation_logs_no_error() {
    let pool = budgeted_pool(2560);
    let _a = pool.allocate(64);
    let _b = pool.allocate(128);

    let (small, logs) = capture_logs(|| pool.try_allocate(8));
    assert!(small.is_ok());
    assert!(logs.contains("scavenged a free block"), "{logs}");
    assert!(logs.contains("memory allocation failed"), "{logs}");
    assert!(!logs.contains("ERROR"), "{logs}");

    if let Ok(small) = small {
        unsafe { pool.deallocate(small, 8) };
    }
}

#[test]
fn test_reported_exhaustion_logs_no_error() {
    let pool = budgeted_pool(0);

    let (result, logs) = capture_logs(|| pool.try_allocate(16));
    assert!(result.is_err());
    assert!(logs.contains("DEBUG"), "{logs}");
    assert!(!logs.contains("ERROR"), "{logs}");
}
