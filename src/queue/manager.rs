use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::config::{QUEUE, QueueConfig};

#[cfg(debug_assertions)]
use crate::config::DF;

use super::cache::TtlCache;
use super::error::QueueError;
use super::executor::{self, BatchReport};
use super::item::{Outcome, Ticket, WorkItem};
use super::lanes::LaneSet;
use super::rate_limiter::RateLimiter;
use super::retry::RetryPolicy;
use super::telemetry::{AutoTuner, QueueStatus, Stats, TuningAction};

/// Everything that must change together: lane membership, call history and
/// counters live behind one lock.
pub(crate) struct QueueState<T> {
    pub lanes: LaneSet<T>,
    pub limiter: RateLimiter,
    pub stats: Stats,
    pub tuner: AutoTuner,
    pub closed: bool,
}

pub(crate) struct Shared<T> {
    pub state: Mutex<QueueState<T>>,
    /// Cache correctness does not depend on queue order, so it has its own lock
    pub cache: Mutex<TtlCache<T>>,
    pub retry: RetryPolicy,
    pub config: QueueConfig,
}

/// Handle to the request scheduler. Cheap to clone; every clone talks to the
/// same lanes, cache and limiter. Build one at startup and pass it around.
pub struct QueueManager<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for QueueManager<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> QueueManager<T>
where
    T: Clone + Send + 'static,
{
    pub fn new(config: QueueConfig) -> Result<Self, QueueError> {
        config.validate()?;

        let state = QueueState {
            lanes: LaneSet::new(),
            limiter: RateLimiter::new(config.max_requests_per_minute, config.request_interval()),
            stats: Stats::new(QUEUE.batch.latency_samples),
            tuner: AutoTuner::new(),
            closed: false,
        };

        Ok(Self {
            shared: Arc::new(Shared {
                state: Mutex::new(state),
                cache: Mutex::new(TtlCache::new()),
                retry: RetryPolicy::new(config.max_attempts),
                config,
            }),
        })
    }

    pub fn config(&self) -> &QueueConfig {
        &self.shared.config
    }

    /// Queue an item in the lane for its priority. Returns the item id.
    pub async fn submit(&self, item: WorkItem<T>) -> Result<String, QueueError> {
        let mut state = self.shared.state.lock().await;
        if state.closed {
            return Err(QueueError::Shutdown);
        }

        let id = item.id.clone();
        #[cfg(debug_assertions)]
        if DF.log_queue_events {
            log::info!("Queued [{}] at {} priority", id, item.priority);
        }

        state.stats.total_requests += 1;
        state.lanes.enqueue(item);
        Ok(id)
    }

    /// Like `submit`, but hands back a ticket that resolves with the item's
    /// terminal outcome no matter which worker runs it.
    pub async fn submit_tracked(&self, mut item: WorkItem<T>) -> Result<Ticket<T>, QueueError> {
        let rx = item.add_waiter();
        let id = self.submit(item).await?;
        Ok(Ticket::new(id, rx))
    }

    /// Submit and drive batches on the calling task until this item resolves.
    pub async fn submit_and_wait(&self, item: WorkItem<T>) -> Result<Outcome<T>, QueueError> {
        let mut ticket = self.submit_tracked(item).await?;
        let timeout = Duration::from_secs(QUEUE.batch.timeout_secs);

        loop {
            if let Some(outcome) = ticket.try_take() {
                return Ok(outcome);
            }
            let report = self.run_batch(QUEUE.batch.batch_size, timeout).await;
            if report.processed == 0 && report.remaining == 0 {
                // Lanes are empty, so another worker holds the item.
                return Ok(ticket.wait().await);
            }
        }
    }

    /// Process up to `batch_size` items, stopping early when the lanes run dry
    /// or `timeout` elapses. Never fails; errors are returned as outcomes.
    pub async fn run_batch(&self, batch_size: usize, timeout: Duration) -> BatchReport<T> {
        executor::run_batch(&self.shared, batch_size, timeout).await
    }

    /// Collapse duplicate `(id, cache_key)` submissions within each lane.
    pub async fn optimize(&self) -> usize {
        let removed = self.shared.state.lock().await.lanes.optimize();
        if removed > 0 {
            log::info!("🧹 Removed {} duplicate request(s) from the lanes", removed);
        }
        removed
    }

    pub async fn status(&self) -> QueueStatus {
        let status = {
            let mut state = self.shared.state.lock().await;
            let lanes = state.lanes.counts();
            let requests_last_minute = state.limiter.calls_in_window(Instant::now());
            QueueStatus {
                lanes,
                total_pending: lanes.total(),
                total_requests: state.stats.total_requests,
                completed: state.stats.completed,
                failed: state.stats.failed,
                cached: state.stats.cached,
                rate_limit_hits: state.stats.rate_limit_hits,
                requests_last_minute,
                cache_size: 0,
                cache_hits: 0,
                cache_misses: 0,
                avg_response_secs: state.stats.average_latency().as_secs_f64(),
                request_interval_secs: state.limiter.interval().as_secs_f64(),
                efficiency: state.stats.efficiency(),
            }
        };

        let cache = self.shared.cache.lock().await;
        QueueStatus {
            cache_size: cache.len(),
            cache_hits: cache.hits(),
            cache_misses: cache.misses(),
            ..status
        }
    }

    /// Nudge the pacing interval based on pressure since the previous call.
    pub async fn auto_adjust_rates(&self) -> TuningAction {
        let mut state = self.shared.state.lock().await;
        let QueueState {
            limiter,
            stats,
            tuner,
            ..
        } = &mut *state;

        let (next, action) =
            tuner.adjust(stats, limiter.interval(), self.shared.config.interval_bounds());
        limiter.set_interval(next);

        match action {
            TuningAction::SlowedDown { from, to } => log::warn!(
                "🐢 Rate pressure: request interval {:.2}s -> {:.2}s",
                from.as_secs_f64(),
                to.as_secs_f64()
            ),
            TuningAction::SpedUp { from, to } => log::info!(
                "🐇 No rate pressure: request interval {:.2}s -> {:.2}s",
                from.as_secs_f64(),
                to.as_secs_f64()
            ),
            TuningAction::Unchanged => {}
        }
        action
    }

    pub async fn pending(&self) -> usize {
        self.shared.state.lock().await.lanes.len()
    }

    pub async fn purge_expired_cache(&self) -> usize {
        self.shared.cache.lock().await.purge_expired()
    }

    pub async fn is_shut_down(&self) -> bool {
        self.shared.state.lock().await.closed
    }

    /// Stop accepting work. Anything still queued is resolved with an error.
    pub async fn shutdown(&self) {
        let drained = {
            let mut state = self.shared.state.lock().await;
            if state.closed {
                return;
            }
            state.closed = true;
            state.lanes.drain()
        };

        let abandoned = drained.len();
        for mut item in drained {
            let reason = format!("queue shut down before [{}] ran", item.id);
            item.resolve(&Err(reason));
        }
        log::info!("Queue shut down ({} pending request(s) abandoned)", abandoned);
    }
}
