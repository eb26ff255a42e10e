use std::future::Future;
use std::sync::LazyLock;
use std::time::Duration;

use tokio::runtime::{Builder, Handle, Runtime};
use tokio::task::JoinHandle;

const BACKGROUND_WORKER_THREADS: usize = 2;

static BACKGROUND_RUNTIME: LazyLock<Option<Runtime>> = LazyLock::new(|| {
    match Builder::new_multi_thread()
        .worker_threads(BACKGROUND_WORKER_THREADS)
        .thread_name("push-lifecycle-bg")
        .enable_all()
        .build()
    {
        Ok(runtime) => Some(runtime),
        Err(err) => {
            log::error!("failed to build background tokio runtime: {err}");
            None
        }
    }
});

/// Spawns `future` in the background without waiting for it.
///
/// Uses the ambient tokio runtime when called from inside one, otherwise a
/// lazily built process-wide runtime. Returns `None` only if no runtime could
/// be obtained, in which case the future is dropped.
pub fn spawn_detached<F>(future: F) -> Option<JoinHandle<()>>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(handle) = Handle::try_current() {
        return Some(handle.spawn(future));
    }
    BACKGROUND_RUNTIME
        .as_ref()
        .map(|runtime| runtime.spawn(future))
}

/// Asynchronously waits for the provided duration.
pub async fn sleep(duration: Duration) {
    if duration.is_zero() {
        return;
    }
    tokio::time::sleep(duration).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn spawns_outside_of_a_runtime() {
        let (tx, rx) = mpsc::channel();
        let handle = spawn_detached(async move {
            let _ = tx.send(7);
        });
        assert!(handle.is_some());
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)), Ok(7));
    }

    #[tokio::test(start_paused = true)]
    async fn uses_the_ambient_runtime() {
        let handle = spawn_detached(async {
            sleep(Duration::from_secs(60)).await;
        })
        .expect("ambient runtime");
        handle.await.expect("task completes");
    }
}
