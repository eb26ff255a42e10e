use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::platform::runtime::{sleep, spawn_detached};

struct PendingTask {
    id: u64,
    delay: Duration,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct SchedulerInner {
    slot: Mutex<Option<PendingTask>>,
    next_id: AtomicU64,
}

impl SchedulerInner {
    fn slot(&self) -> MutexGuard<'_, Option<PendingTask>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Vacates the slot if it still belongs to task `id`.
    fn release(&self, id: u64) -> bool {
        let mut slot = self.slot();
        match slot.as_ref() {
            Some(pending) if pending.id == id => {
                slot.take();
                true
            }
            _ => false,
        }
    }
}

/// Single-slot delayed task runner.
///
/// At most one task is pending at any time: arming a new one aborts the
/// previous. A task leaves the slot right before it runs, so it may arm the
/// scheduler again from its own body.
#[derive(Clone, Default)]
pub struct RetryScheduler {
    inner: Arc<SchedulerInner>,
}

impl RetryScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `task` after `delay`, replacing any pending task.
    ///
    /// Returns `false` when no runtime was available to host the timer.
    pub fn schedule<F>(&self, delay: Duration, task: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        let mut slot = self.inner.slot();
        if let Some(previous) = slot.take() {
            log::debug!("replacing pending retry #{}", previous.id);
            previous.handle.abort();
        }

        let inner = Arc::clone(&self.inner);
        let spawned = spawn_detached(async move {
            sleep(delay).await;
            if !inner.release(id) {
                return;
            }
            log::trace!("retry #{id} fired after {delay:?}");
            task.await;
        });

        match spawned {
            Some(handle) => {
                *slot = Some(PendingTask { id, delay, handle });
                true
            }
            None => false,
        }
    }

    /// Aborts the pending task, if any. Returns whether one was pending.
    pub fn cancel(&self) -> bool {
        match self.inner.slot().take() {
            Some(pending) => {
                log::debug!("cancelled pending retry #{}", pending.id);
                pending.handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.inner.slot().is_some()
    }

    pub fn pending_delay(&self) -> Option<Duration> {
        self.inner.slot().as_ref().map(|pending| pending.delay)
    }
}

impl std::fmt::Debug for RetryScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryScheduler")
            .field("pending_delay", &self.pending_delay())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counter_task(counter: &Arc<AtomicUsize>) -> impl Future<Output = ()> + Send + 'static {
        let counter = Arc::clone(counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fires_once_after_delay() {
        let scheduler = RetryScheduler::new();
        let fired = Arc::new(AtomicUsize::new(0));

        assert!(scheduler.schedule(Duration::from_secs(5), counter_task(&fired)));
        assert!(scheduler.is_pending());
        assert_eq!(scheduler.pending_delay(), Some(Duration::from_secs(5)));

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!scheduler.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn rescheduling_replaces_the_pending_task() {
        let scheduler = RetryScheduler::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        scheduler.schedule(Duration::from_secs(5), counter_task(&first));
        scheduler.schedule(Duration::from_secs(10), counter_task(&second));

        tokio::time::sleep(Duration::from_secs(11)).await;
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_is_idempotent_and_scheduler_stays_usable() {
        let scheduler = RetryScheduler::new();
        let fired = Arc::new(AtomicUsize::new(0));

        assert!(!scheduler.cancel());
        scheduler.schedule(Duration::from_secs(5), counter_task(&fired));
        assert!(scheduler.cancel());
        assert!(!scheduler.cancel());

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        scheduler.schedule(Duration::from_secs(5), counter_task(&fired));
        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn task_can_rearm_itself() {
        let scheduler = RetryScheduler::new();
        let fired = Arc::new(AtomicUsize::new(0));

        fn arm(scheduler: RetryScheduler, fired: Arc<AtomicUsize>) {
            let next = scheduler.clone();
            scheduler.schedule(Duration::from_secs(5), async move {
                fired.fetch_add(1, Ordering::SeqCst);
                arm(next, fired);
            });
        }

        arm(scheduler.clone(), Arc::clone(&fired));
        tokio::time::sleep(Duration::from_secs(16)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 3);
        assert!(scheduler.is_pending());
        scheduler.cancel();
    }
}
