//! Signal handling for graceful shutdown.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{Error, Result};

/// Longest single sleep while waiting, so shutdown is noticed promptly
const WAIT_SLICE: Duration = Duration::from_millis(50);

/// Set up a Ctrl-C handler that clears the returned running flag.
///
/// # Example
/// ```ignore
/// let running = setup_ctrl_c_handler()?;
/// while running.load(Ordering::SeqCst) {
///     // ... serve ...
/// }
/// ```
pub fn setup_ctrl_c_handler() -> Result<Arc<AtomicBool>> {
    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    })
    .map_err(|e| Error::Other(format!("Failed to install Ctrl-C handler: {}", e)))?;
    Ok(running)
}

/// Sleep until `warmup` has elapsed since `started`.
///
/// Returns `false` if the running flag clears first.
pub fn wait_for_warmup(started: Instant, warmup: Duration, running: &AtomicBool) -> bool {
    let remaining = warmup.saturating_sub(started.elapsed());
    if !remaining.is_zero() {
        log::info!("Waiting {} ms before starting", remaining.as_millis());
    }

    while started.elapsed() < warmup {
        if !running.load(Ordering::SeqCst) {
            return false;
        }
        let left = warmup.saturating_sub(started.elapsed());
        thread::sleep(left.min(WAIT_SLICE));
    }
    running.load(Ordering::SeqCst)
}
