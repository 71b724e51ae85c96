//! Cleanup Worker - 后台清理任务
//!
//! 转换完成后通过有界队列提交清理请求，队列满时直接丢弃（下一次完成还会再提交）。
//! Worker 依次清理过期音频产物和过期历史记录。

use std::sync::Arc;
use tokio::sync::mpsc;

use crate::application::ports::{
    ArtifactStoragePort, CleanupRequest, CleanupSchedulerPort, HistoryRepositoryPort,
};

/// 清理队列发送端
#[derive(Clone)]
pub struct CleanupQueue {
    sender: mpsc::Sender<CleanupRequest>,
}

impl CleanupQueue {
    /// 创建队列，返回发送端和交给 Worker 的接收端
    pub fn bounded(capacity: usize) -> (Self, mpsc::Receiver<CleanupRequest>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }
}

impl CleanupSchedulerPort for CleanupQueue {
    fn schedule(&self, request: CleanupRequest) -> bool {
        match self.sender.try_send(request) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!("Cleanup queue full, dropping request");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::warn!("Cleanup worker stopped, dropping request");
                false
            }
        }
    }
}

/// 清理 Worker
pub struct CleanupWorker {
    queue_receiver: mpsc::Receiver<CleanupRequest>,
    storage: Arc<dyn ArtifactStoragePort>,
    history: Arc<dyn HistoryRepositoryPort>,
}

impl CleanupWorker {
    pub fn new(
        queue_receiver: mpsc::Receiver<CleanupRequest>,
        storage: Arc<dyn ArtifactStoragePort>,
        history: Arc<dyn HistoryRepositoryPort>,
    ) -> Self {
        Self {
            queue_receiver,
            storage,
            history,
        }
    }

    /// 启动 Worker，所有发送端关闭后退出
    pub async fn run(mut self) {
        tracing::info!("CleanupWorker started");

        while let Some(mut request) = self.queue_receiver.recv().await {
            // 突发完成时合并排队中的请求，只清理一次
            while let Ok(next) = self.queue_receiver.try_recv() {
                request = CleanupRequest {
                    artifact_max_age_days: request
                        .artifact_max_age_days
                        .min(next.artifact_max_age_days),
                    history_max_age_days: request
                        .history_max_age_days
                        .min(next.history_max_age_days),
                };
            }

            self.process(request).await;
        }

        tracing::info!("CleanupWorker stopped");
    }

    async fn process(&self, request: CleanupRequest) {
        match self.storage.sweep(request.artifact_max_age_days).await {
            Ok(result) => tracing::debug!(
                deleted = result.deleted_files,
                failed = result.failed_files,
                "Artifact cleanup done"
            ),
            Err(e) => tracing::error!(error = %e, "Artifact cleanup failed"),
        }

        match self
            .history
            .cleanup_older_than(request.history_max_age_days)
            .await
        {
            Ok(deleted) => tracing::debug!(deleted, "History cleanup done"),
            Err(e) => tracing::error!(error = %e, "History cleanup failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::ConversionRecord;
    use crate::infrastructure::adapters::FileArtifactStore;
    use crate::infrastructure::persistence::{
        create_pool, run_migrations, DatabaseConfig, SqliteHistoryRepository,
    };
    use chrono::{Duration as ChronoDuration, Utc};
    use std::time::{Duration, SystemTime};
    use tempfile::tempdir;
    use uuid::Uuid;

    #[test]
    fn test_full_queue_drops_request() {
        let (queue, _receiver) = CleanupQueue::bounded(1);

        assert!(queue.schedule(CleanupRequest::default()));
        assert!(!queue.schedule(CleanupRequest::default()));
    }

    #[test]
    fn test_closed_queue_drops_request() {
        let (queue, receiver) = CleanupQueue::bounded(4);
        drop(receiver);

        assert!(!queue.schedule(CleanupRequest::default()));
    }

    #[tokio::test]
    async fn test_worker_sweeps_artifacts_and_history() {
        let temp_dir = tempdir().unwrap();
        let storage = Arc::new(FileArtifactStore::new(temp_dir.path()).await.unwrap());

        let stale = temp_dir.path().join("stale.mp3");
        std::fs::write(&stale, b"old").unwrap();
        std::fs::File::options()
            .write(true)
            .open(&stale)
            .unwrap()
            .set_modified(SystemTime::now() - Duration::from_secs(8 * 24 * 60 * 60))
            .unwrap();
        let fresh = temp_dir.path().join("fresh.mp3");
        std::fs::write(&fresh, b"new").unwrap();

        let pool = create_pool(&DatabaseConfig::in_memory()).await.unwrap();
        run_migrations(&pool).await.unwrap();
        let history = Arc::new(SqliteHistoryRepository::new(pool));
        let mut old_record = ConversionRecord::pending(Uuid::new_v4(), "old", None, None);
        old_record.created_at = Utc::now() - ChronoDuration::days(40);
        history.create_pending(&old_record).await.unwrap();

        let (queue, receiver) = CleanupQueue::bounded(8);
        let worker = CleanupWorker::new(receiver, storage, history.clone());

        assert!(queue.schedule(CleanupRequest::default()));
        assert!(queue.schedule(CleanupRequest::default()));
        drop(queue);

        worker.run().await;

        assert!(!stale.exists());
        assert!(fresh.exists());
        assert!(history.find_by_id(old_record.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_spawned_worker_finishes_after_senders_drop() {
        let temp_dir = tempdir().unwrap();
        let storage = Arc::new(FileArtifactStore::new(temp_dir.path()).await.unwrap());
        let pool = create_pool(&DatabaseConfig::in_memory()).await.unwrap();
        run_migrations(&pool).await.unwrap();
        let history = Arc::new(SqliteHistoryRepository::new(pool));

        let (queue, receiver) = CleanupQueue::bounded(4);
        let handle = tokio::spawn(CleanupWorker::new(receiver, storage, history).run());

        let shared = queue.clone();
        assert!(shared.schedule(CleanupRequest::default()));
        drop(queue);
        assert!(!handle.is_finished());
        drop(shared);

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("worker should stop once every sender is gone")
            .unwrap();
    }
}
