use std::future::Future;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::AbortHandle;
use tracing::trace;

const PENDING: u8 = 0;
const FIRED: u8 = 1;
const CANCELLED: u8 = 2;

/// Schedules delayed callbacks on the tokio runtime and hands back a
/// cancelable handle for each one.
///
/// A callback runs at most once, never before its delay has elapsed.
/// Whichever of "fire" and "cancel" claims the handle first wins; the other
/// becomes a no-op.
#[derive(Debug, Clone, Default)]
pub struct ExpiryScheduler {
    counters: Arc<Counters>,
}

#[derive(Debug, Default)]
struct Counters {
    scheduled: AtomicU64,
    fired: AtomicU64,
    cancelled: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerStats {
    pub scheduled: u64,
    pub fired: u64,
    pub cancelled: u64,
}

impl SchedulerStats {
    pub fn pending(&self) -> u64 {
        self.scheduled.saturating_sub(self.fired).saturating_sub(self.cancelled)
    }
}

impl ExpiryScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `callback` once `delay` has elapsed, unless the returned handle is
    /// canceled (or dropped) first.
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule<F, Fut>(&self, delay: Duration, callback: F) -> CancellationHandle
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let state = Arc::new(AtomicU8::new(PENDING));
        let task_state = Arc::clone(&state);
        let counters = Arc::clone(&self.counters);
        // Counted before spawning so a fire never outruns its own schedule.
        self.counters.scheduled.fetch_add(1, Ordering::Relaxed);

        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if task_state
                .compare_exchange(PENDING, FIRED, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                return;
            }
            counters.fired.fetch_add(1, Ordering::Relaxed);
            callback().await;
        });

        trace!("Scheduled expiry callback in {:?}", delay);

        CancellationHandle {
            state,
            task: task.abort_handle(),
            counters: Arc::clone(&self.counters),
        }
    }

    /// Cancel a pending callback. Safe to call on fired or already-canceled
    /// handles; returns whether this call prevented the callback.
    pub fn cancel(&self, handle: &CancellationHandle) -> bool {
        handle.cancel()
    }

    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            scheduled: self.counters.scheduled.load(Ordering::Relaxed),
            fired: self.counters.fired.load(Ordering::Relaxed),
            cancelled: self.counters.cancelled.load(Ordering::Relaxed),
        }
    }
}

/// Handle to one scheduled callback. Dropping it cancels the callback.
#[derive(Debug)]
pub struct CancellationHandle {
    state: Arc<AtomicU8>,
    task: AbortHandle,
    counters: Arc<Counters>,
}

impl CancellationHandle {
    pub fn cancel(&self) -> bool {
        let claimed = self
            .state
            .compare_exchange(PENDING, CANCELLED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if claimed {
            // The task is still sleeping; stop it early.
            self.task.abort();
            self.counters.cancelled.fetch_add(1, Ordering::Relaxed);
        }
        claimed
    }

    pub fn is_pending(&self) -> bool {
        self.state.load(Ordering::Acquire) == PENDING
    }

    pub fn has_fired(&self) -> bool {
        self.state.load(Ordering::Acquire) == FIRED
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.load(Ordering::Acquire) == CANCELLED
    }
}

impl Drop for CancellationHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Instant;

    fn counting_callback(
        hits: &Arc<AtomicUsize>,
    ) -> impl Send + 'static + FnOnce() -> std::future::Ready<()> {
        let hits = Arc::clone(hits);
        move || {
            hits.fetch_add(1, Ordering::SeqCst);
            std::future::ready(())
        }
    }

    #[tokio::test]
    async fn test_callback_fires_once_after_delay() {
        let scheduler = ExpiryScheduler::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let started = Instant::now();

        let handle = scheduler.schedule(Duration::from_millis(50), counting_callback(&hits));
        assert!(handle.is_pending());

        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(handle.has_fired());
        assert!(started.elapsed() >= Duration::from_millis(50));
        assert_eq!(scheduler.stats().fired, 1);
        assert_eq!(scheduler.stats().pending(), 0);
    }

    #[tokio::test]
    async fn test_cancel_prevents_callback() {
        let scheduler = ExpiryScheduler::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let handle = scheduler.schedule(Duration::from_millis(50), counting_callback(&hits));
        assert!(scheduler.cancel(&handle));

        tokio::time::sleep(Duration::from_millis(150)).await;

        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert!(handle.is_cancelled());
        assert_eq!(scheduler.stats().cancelled, 1);
    }

    #[tokio::test]
    async fn test_cancel_is_idempotent_and_noop_after_fire() {
        let scheduler = ExpiryScheduler::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let cancelled = scheduler.schedule(Duration::from_millis(20), counting_callback(&hits));
        assert!(cancelled.cancel());
        assert!(!cancelled.cancel());

        let fired = scheduler.schedule(Duration::from_millis(20), counting_callback(&hits));
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(!fired.cancel());
        assert!(fired.has_fired());

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        let stats = scheduler.stats();
        assert_eq!(stats.scheduled, 2);
        assert_eq!(stats.fired, 1);
        assert_eq!(stats.cancelled, 1);
    }

    #[test]
    fn test_pending_never_underflows() {
        let overlapping_read = SchedulerStats {
            scheduled: 1,
            fired: 1,
            cancelled: 1,
        };
        assert_eq!(overlapping_read.pending(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_zero_delay_stats_stay_consistent() {
        let scheduler = ExpiryScheduler::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..50)
            .map(|_| scheduler.schedule(Duration::ZERO, counting_callback(&hits)))
            .collect();
        for _ in 0..50 {
            let stats = scheduler.stats();
            assert!(stats.fired + stats.cancelled <= stats.scheduled);
            tokio::task::yield_now().await;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(hits.load(Ordering::SeqCst), handles.len());
        assert_eq!(scheduler.stats().pending(), 0);
    }

    #[tokio::test]
    async fn test_dropping_handle_cancels() {
        let scheduler = ExpiryScheduler::new();
        let hits = Arc::new(AtomicUsize::new(0));

        drop(scheduler.schedule(Duration::from_millis(20), counting_callback(&hits)));
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(scheduler.stats().cancelled, 1);
    }
}
