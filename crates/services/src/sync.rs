//! Debounced background persistence of the metadata document.
//!
//! Every state mutation schedules a snapshot; the task waits out a quiet
//! period and writes only the latest one, so a burst of edits costs one
//! upsert. A failed write is logged and dropped; the next change schedules
//! a fresh snapshot anyway.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use studyunit_core::model::{StateDocument, UserId};
use studyunit_storage::StateRepository;

/// Quiet period after the last change before a write goes out.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_secs(3);

pub struct SyncCoordinator;

/// Handle for scheduling snapshots. Dropping or closing it flushes any
/// pending snapshot and stops the task.
pub struct SyncHandle {
    tx: mpsc::UnboundedSender<StateDocument>,
    task: JoinHandle<()>,
}

impl SyncCoordinator {
    /// Spawn the sync task for one signed-in user.
    #[must_use]
    pub fn spawn(
        repo: Arc<dyn StateRepository>,
        user: UserId,
        debounce: Duration,
    ) -> SyncHandle {
        let (tx, mut rx) = mpsc::unbounded_channel::<StateDocument>();
        let task = tokio::spawn(async move {
            while let Some(mut doc) = rx.recv().await {
                // Coalesce while snapshots keep arriving inside the window.
                loop {
                    tokio::select! {
                        next = rx.recv() => match next {
                            Some(latest) => doc = latest,
                            None => break,
                        },
                        () = tokio::time::sleep(debounce) => break,
                    }
                }
                if let Err(err) = repo.upsert_state(&user, &doc).await {
                    tracing::warn!(%err, "metadata sync failed; a later change will retry");
                }
            }
        });
        SyncHandle { tx, task }
    }
}

impl SyncHandle {
    /// Queue the latest snapshot; earlier unsent snapshots are superseded.
    pub fn schedule(&self, doc: StateDocument) {
        if self.tx.send(doc).is_err() {
            tracing::warn!("sync task is gone; snapshot dropped");
        }
    }

    /// Flush any pending snapshot and stop the task.
    pub async fn close(self) {
        drop(self.tx);
        if let Err(err) = self.task.await {
            if err.is_panic() {
                tracing::warn!("sync task panicked during shutdown");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use studyunit_core::model::AppState;
    use studyunit_core::time::fixed_now;
    use studyunit_storage::StorageError;

    #[derive(Default)]
    struct RecordingRepo {
        writes: Mutex<Vec<StateDocument>>,
    }

    #[async_trait]
    impl StateRepository for RecordingRepo {
        async fn upsert_state(
            &self,
            _user: &UserId,
            doc: &StateDocument,
        ) -> Result<(), StorageError> {
            self.writes.lock().unwrap().push(doc.clone());
            Ok(())
        }

        async fn fetch_state(
            &self,
            _user: &UserId,
        ) -> Result<Option<StateDocument>, StorageError> {
            Ok(self.writes.lock().unwrap().last().cloned())
        }
    }

    fn doc(minutes: u32) -> StateDocument {
        let mut state = AppState::initial(fixed_now());
        state.daily_time_minutes = minutes;
        state.document()
    }

    #[tokio::test]
    async fn a_burst_of_snapshots_coalesces_into_one_write() {
        let repo = Arc::new(RecordingRepo::default());
        let handle = SyncCoordinator::spawn(
            repo.clone(),
            UserId::new("u1"),
            Duration::from_millis(50),
        );

        handle.schedule(doc(10));
        handle.schedule(doc(20));
        handle.schedule(doc(30));
        handle.close().await;

        let writes = repo.writes.lock().unwrap();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].daily_time_minutes, 30);
    }

    #[tokio::test]
    async fn separated_bursts_each_get_a_write() {
        let repo = Arc::new(RecordingRepo::default());
        let handle = SyncCoordinator::spawn(
            repo.clone(),
            UserId::new("u1"),
            Duration::from_millis(10),
        );

        handle.schedule(doc(10));
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.schedule(doc(20));
        handle.close().await;

        let writes = repo.writes.lock().unwrap();
        assert_eq!(writes.len(), 2);
        assert_eq!(writes[1].daily_time_minutes, 20);
    }
}
