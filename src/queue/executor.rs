//! The batch loop: cache-or-network resolution of dequeued items.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::{Instant, sleep};

#[cfg(debug_assertions)]
use crate::config::DF;

use super::item::{ItemStatus, Outcome, WorkItem};
use super::manager::Shared;
use super::rate_limiter::Admission;
use super::retry::RetryDecision;

/// What one `run_batch` call produced.
#[derive(Debug)]
pub struct BatchReport<T> {
    /// Terminal outcomes keyed by item id
    pub results: HashMap<String, Outcome<T>>,
    /// Items that reached a terminal state in this batch
    pub processed: usize,
    /// Items still queued when the batch ended
    pub remaining: usize,
}

impl<T> BatchReport<T> {
    pub fn successes(&self) -> usize {
        self.results.values().filter(|r| r.is_ok()).count()
    }

    pub fn failures(&self) -> usize {
        self.results.values().filter(|r| r.is_err()).count()
    }
}

pub(crate) async fn run_batch<T>(
    shared: &Shared<T>,
    batch_size: usize,
    timeout: Duration,
) -> BatchReport<T>
where
    T: Clone + Send + 'static,
{
    let deadline = Instant::now() + timeout;
    let mut results = HashMap::new();
    let mut processed = 0;

    while processed < batch_size && Instant::now() < deadline {
        let Some(mut item) = shared.state.lock().await.lanes.dequeue_next() else {
            break;
        };

        #[cfg(debug_assertions)]
        if DF.log_queue_events {
            log::info!(
                "Dequeued [{}] ({}, attempt {}, queued {:.1}s)",
                item.id,
                item.priority,
                item.attempts + 1,
                item.submitted_at.elapsed().as_secs_f64()
            );
        }

        if let Some(value) = cached_value(shared, &item).await {
            item.status = ItemStatus::Cached;
            shared.state.lock().await.stats.cached += 1;
            finish(&mut item, Ok(value), &mut results);
            processed += 1;
            continue;
        }

        if !admit(shared, deadline).await {
            // Never started, so it keeps its place for the next batch.
            shared.state.lock().await.lanes.restore(item);
            break;
        }

        let call_started = Instant::now();
        let label = format!("fetch [{}]", item.id);
        let result = crate::trace_time!(&label, 5_000_000, { item.invoke().await });
        let latency = call_started.elapsed();

        match result {
            Ok(value) => {
                if let Some(key) = &item.cache_key {
                    let ttl = item.ttl.unwrap_or_else(|| shared.config.default_ttl());
                    shared
                        .cache
                        .lock()
                        .await
                        .set(key.clone(), value.clone(), ttl);
                }
                item.status = ItemStatus::Completed;
                {
                    let mut state = shared.state.lock().await;
                    state.stats.completed += 1;
                    state.stats.record_latency(latency);
                }
                finish(&mut item, Ok(value), &mut results);
                processed += 1;
            }
            Err(e) => {
                let message = format!("{:#}", e);
                let decision = shared.retry.on_failure(&mut item);
                let mut state = shared.state.lock().await;
                state.stats.failed += 1;

                match decision {
                    RetryDecision::Retry { attempt } if !state.closed => {
                        log::warn!(
                            "⚠ [{}] failed (attempt {}/{}): {}. Requeued at low priority.",
                            item.id,
                            attempt,
                            shared.retry.budget_for(&item),
                            message
                        );
                        item.status = ItemStatus::Pending;
                        state.lanes.requeue_retry(item);
                    }
                    _ => {
                        drop(state);
                        log::error!(
                            "❌ [{}] gave up after {} attempt(s): {}",
                            item.id,
                            item.attempts,
                            message
                        );
                        finish(&mut item, Err(message), &mut results);
                        processed += 1;
                    }
                }
            }
        }
    }

    let remaining = shared.state.lock().await.lanes.len();
    BatchReport {
        results,
        processed,
        remaining,
    }
}

async fn cached_value<T: Clone>(shared: &Shared<T>, item: &WorkItem<T>) -> Option<T> {
    let key = item.cache_key.as_deref()?;
    let value = shared.cache.lock().await.get(key);

    #[cfg(debug_assertions)]
    if DF.log_cache && value.is_some() {
        log::info!("Cache hit [{}] for [{}]", key, item.id);
    }
    value
}

/// Wait until the limiter admits a call. The queue lock is released while
/// sleeping. Returns false if the deadline arrives first.
async fn admit<T>(shared: &Shared<T>, deadline: Instant) -> bool {
    loop {
        let wait = {
            let mut state = shared.state.lock().await;
            match state.limiter.try_admit(Instant::now()) {
                Admission::Granted => return true,
                Admission::WindowFull(wait) => {
                    state.stats.rate_limit_hits += 1;
                    #[cfg(debug_assertions)]
                    if DF.log_rate_limiter {
                        log::warn!(
                            "🛑 Rate limit saturated ({} calls/60s). Waiting {:.1}s...",
                            state.limiter.max_per_window(),
                            wait.as_secs_f64()
                        );
                    }
                    wait
                }
                Admission::Pacing(wait) => wait,
            }
        };

        let now = Instant::now();
        if now + wait > deadline {
            sleep(deadline.saturating_duration_since(now)).await;
            return false;
        }
        sleep(wait).await;
    }
}

fn finish<T: Clone>(
    item: &mut WorkItem<T>,
    outcome: Outcome<T>,
    results: &mut HashMap<String, Outcome<T>>,
) {
    item.resolve(&outcome);
    results.insert(item.id.clone(), outcome);
}
