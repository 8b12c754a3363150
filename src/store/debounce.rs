use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

const WAITING: u8 = 0;
const FIRED: u8 = 1;
const CANCELLED: u8 = 2;

/// One scheduled job. The phase flips exactly once, from waiting to either
/// fired or cancelled, so a job that has started its work is never aborted.
#[derive(Debug)]
struct Job {
    handle: JoinHandle<()>,
    phase: Arc<AtomicU8>,
}

impl Job {
    /// Claim a still-waiting job for cancellation
    fn try_cancel(&self) -> bool {
        let cancelled = self
            .phase
            .compare_exchange(WAITING, CANCELLED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if cancelled {
            self.handle.abort();
        }
        cancelled
    }
}

/// Runs work after a quiet period, restarting the period on every new
/// request. Owns a single timer slot: at most one job is waiting.
///
/// Work that has already started runs to completion even if the job is
/// replaced or cancelled; callers that need ordering between runs must
/// serialize inside the work itself.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    pending: Mutex<Option<Job>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Debouncer {
            delay,
            pending: Mutex::new(None),
        }
    }

    /// Cancel any waiting job and arm a new one that runs `work` once the
    /// delay elapses. Must be called from within a Tokio runtime; otherwise
    /// the work is dropped.
    pub fn schedule<F>(&self, work: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let Ok(handle) = Handle::try_current() else {
            tracing::warn!("no async runtime available, dropping scheduled work");
            return;
        };
        let delay = self.delay;
        let phase = Arc::new(AtomicU8::new(WAITING));
        let job_phase = Arc::clone(&phase);
        let mut pending = self.pending.lock();
        if let Some(previous) = pending.take() {
            // A fired job keeps running detached
            previous.try_cancel();
        }
        let handle = handle.spawn(async move {
            tokio::time::sleep(delay).await;
            if job_phase
                .compare_exchange(WAITING, FIRED, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                return;
            }
            work.await;
        });
        *pending = Some(Job { handle, phase });
    }

    /// Cancel the job if its delay has not elapsed yet. Returns true if a
    /// waiting job was cancelled; a job whose work already started is left
    /// to finish.
    pub fn cancel(&self) -> bool {
        let mut pending = self.pending.lock();
        match pending.as_ref() {
            Some(job) if job.try_cancel() => {
                pending.take();
                true
            }
            _ => false,
        }
    }

    /// True while the latest job is waiting or still running its work
    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .as_ref()
            .is_some_and(|job| !job.handle.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        if let Some(job) = self.pending.get_mut().take() {
            job.try_cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter_job(counter: &Arc<AtomicUsize>, value: usize) -> impl Future<Output = ()> + Send + 'static {
        let counter = Arc::clone(counter);
        async move {
            counter.store(value, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn runs_after_quiet_period() {
        let debouncer = Debouncer::new(Duration::from_millis(300));
        let hits = Arc::new(AtomicUsize::new(0));
        debouncer.schedule(counter_job(&hits, 1));

        tokio::time::sleep(Duration::from_millis(299)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert!(debouncer.is_pending());

        tokio::time::sleep(Duration::from_millis(2)).await;
        tokio::task::yield_now().await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn new_request_replaces_pending_one() {
        let debouncer = Debouncer::new(Duration::from_millis(300));
        let value = Arc::new(AtomicUsize::new(0));
        debouncer.schedule(counter_job(&value, 1));
        tokio::time::sleep(Duration::from_millis(200)).await;
        debouncer.schedule(counter_job(&value, 2));

        // The first deadline passes without anything running
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(value.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(150)).await;
        tokio::task::yield_now().await;
        assert_eq!(value.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_pending_job() {
        let debouncer = Debouncer::new(Duration::from_millis(300));
        let hits = Arc::new(AtomicUsize::new(0));
        debouncer.schedule(counter_job(&hits, 1));
        assert!(debouncer.cancel());
        assert!(!debouncer.cancel());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn started_work_survives_cancel_and_reschedule() {
        let debouncer = Debouncer::new(Duration::from_millis(300));
        let value = Arc::new(AtomicUsize::new(0));
        let slow = {
            let value = Arc::clone(&value);
            async move {
                tokio::time::sleep(Duration::from_millis(100)).await;
                value.fetch_add(1, Ordering::SeqCst);
            }
        };
        debouncer.schedule(slow);

        // Past the delay, midway through the work
        tokio::time::sleep(Duration::from_millis(350)).await;
        assert!(debouncer.is_pending());
        assert!(!debouncer.cancel());

        debouncer.schedule(counter_job(&value, 10));
        assert!(debouncer.cancel());

        settle_for(Duration::from_secs(1)).await;
        assert_eq!(value.load(Ordering::SeqCst), 1);
        assert!(!debouncer.is_pending());
    }

    async fn settle_for(duration: Duration) {
        tokio::time::sleep(duration).await;
        tokio::task::yield_now().await;
    }

    #[test]
    fn schedule_outside_runtime_is_dropped() {
        let debouncer = Debouncer::new(Duration::from_millis(1));
        debouncer.schedule(async {});
        assert!(!debouncer.is_pending());
    }
}
