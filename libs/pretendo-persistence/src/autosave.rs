//! A debounced save timer for file-backed adapters: every `interval`, take a
//! fresh snapshot and persist it, until the owning server shuts down.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{error, trace};

use crate::adapter::{Adapter, Snapshot};

/// Spawns a background task that calls `snapshot` and `adapter.save` every
/// `interval`, stopping as soon as `cancel` fires.
pub fn spawn<F>(
    adapter: Arc<dyn Adapter>,
    interval: Duration,
    cancel: CancellationToken,
    snapshot: F,
) -> tokio::task::JoinHandle<()>
where
    F: Fn() -> Snapshot + Send + Sync + 'static,
{
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(interval) => {
                    let data = snapshot();
                    if let Err(err) = adapter.save(&data).await {
                        error!(?err, "autosave failed");
                    } else {
                        trace!("autosave completed");
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryAdapter;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn stops_as_soon_as_cancelled() {
        let adapter: Arc<dyn Adapter> = Arc::new(MemoryAdapter::new());
        let cancel = CancellationToken::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();

        let handle = spawn(adapter, Duration::from_millis(5), cancel.clone(), move || {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            Snapshot::new()
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();
        handle.await.unwrap();
        assert!(calls.load(Ordering::SeqCst) >= 1);
    }
}
