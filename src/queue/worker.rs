use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::config::QUEUE;

use super::executor::BatchReport;
use super::manager::QueueManager;

/// Background task that keeps draining the lanes in batches until the
/// manager is shut down. Non-empty batch reports are forwarded on `reports`.
pub struct QueueWorker {
    handle: JoinHandle<()>,
}

impl QueueWorker {
    pub fn spawn<T>(
        queue: QueueManager<T>,
        batch_size: usize,
        timeout: Duration,
        reports: Option<UnboundedSender<BatchReport<T>>>,
    ) -> Self
    where
        T: Clone + Send + 'static,
    {
        let idle = Duration::from_millis(QUEUE.batch.idle_poll_ms);

        let handle = tokio::spawn(async move {
            log::info!("Queue worker started (batch {}, timeout {:?})", batch_size, timeout);

            while !queue.is_shut_down().await {
                let report = queue.run_batch(batch_size, timeout).await;

                if report.processed == 0 {
                    if report.remaining == 0 {
                        sleep(idle).await;
                    }
                    continue;
                }

                if let Some(tx) = &reports {
                    if tx.send(report).is_err() {
                        log::debug!("Batch report receiver gone; worker keeps draining");
                    }
                }
            }

            log::info!("Queue worker stopped");
        });

        Self { handle }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the worker to exit. Call after `QueueManager::shutdown`.
    pub async fn join(self) {
        if let Err(e) = self.handle.await {
            log::error!("Queue worker task failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QueueConfig;
    use crate::queue::item::WorkItem;
    use tokio::sync::mpsc;

    #[tokio::test(start_paused = true)]
    async fn test_worker_resolves_tickets_and_reports() {
        let queue = QueueManager::new(QueueConfig::default()).unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let worker = QueueWorker::spawn(queue.clone(), 5, Duration::from_secs(30), Some(tx));

        let ticket = queue
            .submit_tracked(WorkItem::new("coins", || async { Ok("listing".to_string()) }))
            .await
            .unwrap();

        assert_eq!(ticket.wait().await, Ok("listing".to_string()));
        let report = rx.recv().await.unwrap();
        assert_eq!(report.processed, 1);
        assert_eq!(report.successes(), 1);

        queue.shutdown().await;
        worker.join().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_worker_stops_on_shutdown_while_idle() {
        let queue: QueueManager<u8> = QueueManager::new(QueueConfig::default()).unwrap();
        let worker = QueueWorker::spawn(queue.clone(), 5, Duration::from_secs(30), None);

        sleep(Duration::from_secs(1)).await;
        assert!(!worker.is_finished());

        queue.shutdown().await;
        worker.join().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_and_wait_alongside_worker() {
        let queue = QueueManager::new(QueueConfig::default()).unwrap();
        let worker = QueueWorker::spawn(queue.clone(), 5, Duration::from_secs(30), None);

        let outcome = queue
            .submit_and_wait(WorkItem::new("shared", || async { Ok(3u8) }))
            .await
            .unwrap();
        assert_eq!(outcome, Ok(3));

        queue.shutdown().await;
        worker.join().await;
    }
}
