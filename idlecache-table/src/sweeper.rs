//! Timer tasks that drive expiration sweeps.
//!
//! Sweeps run on a small runtime owned by this crate, so tables work the same
//! whether or not the caller is inside a tokio runtime.

use std::sync::OnceLock;
use std::time::{Duration, Instant};

use tokio::runtime::{Builder, Handle, Runtime};
use tokio::task::AbortHandle;
use tracing::error;

static RUNTIME: OnceLock<Option<Runtime>> = OnceLock::new();

/// Longest wait a timer is armed with. Longer waits are clamped, which only
/// makes the sweep fire earlier than needed.
pub(crate) const MAX_WAIT: Duration = Duration::from_secs(86_400 * 365 * 30);

fn handle() -> Option<Handle> {
    RUNTIME
        .get_or_init(|| {
            Builder::new_multi_thread()
                .worker_threads(1)
                .thread_name("idlecache-sweeper")
                .enable_time()
                .build()
                .map_err(|e| error!(error = %e, "Failed to start expiration sweeper runtime"))
                .ok()
        })
        .as_ref()
        .map(|runtime| runtime.handle().clone())
}

/// A scheduled, not yet fired, expiration sweep.
pub(crate) struct PendingSweep {
    /// When the sweep is due to run
    pub due: Instant,
    /// Identifies this arming among all armings of the same table
    pub generation: u64,
    task: AbortHandle,
}

impl PendingSweep {
    /// Cancels the timer. A sweep that already started runs to completion.
    pub fn cancel(self) {
        self.task.abort();
    }
}

/// Arms a one-shot timer that calls `sweep` after `wait`.
///
/// The sweep body runs on the blocking pool since it may call user hooks.
/// Waits longer than [`MAX_WAIT`] are clamped to it.
/// Returns `None` if the sweeper runtime is unavailable.
pub(crate) fn schedule<F>(wait: Duration, generation: u64, sweep: F) -> Option<PendingSweep>
where
    F: FnOnce() + Send + 'static,
{
    let handle = handle()?;
    let wait = wait.min(MAX_WAIT);
    let due = Instant::now() + wait;
    let task = handle.spawn(async move {
        tokio::time::sleep(wait).await;
        if let Err(e) = tokio::task::spawn_blocking(sweep).await {
            error!(error = %e, "Expiration sweep panicked");
        }
    });

    Some(PendingSweep {
        due,
        generation,
        task: task.abort_handle(),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn test_fires_after_wait() {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();

        let pending = schedule(Duration::from_millis(20), 1, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
        assert_eq!(pending.generation, 1);
        assert!(pending.due > Instant::now());

        thread::sleep(Duration::from_millis(150));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cancel_prevents_fire() {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();

        let pending = schedule(Duration::from_millis(50), 1, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
        pending.cancel();

        thread::sleep(Duration::from_millis(150));
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_huge_wait_is_clamped() {
        let before = Instant::now();
        let pending = schedule(Duration::MAX, 1, || {}).unwrap();

        assert!(pending.due >= before + MAX_WAIT);
        assert!(pending.due <= Instant::now() + MAX_WAIT);
        pending.cancel();
    }
}
