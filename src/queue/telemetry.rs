//! Counters, latency averaging, status snapshots and the pacing auto-tuner.

use std::collections::VecDeque;
use std::time::Duration;

use serde::Serialize;
use tabled::{Table, Tabled, settings::Style};

use crate::config::QUEUE;

use super::lanes::LaneCounts;

/// Monotonic counters plus a bounded ring of recent call latencies.
#[derive(Debug)]
pub struct Stats {
    pub total_requests: u64,
    pub completed: u64,
    pub failed: u64,
    pub cached: u64,
    pub rate_limit_hits: u64,
    latencies: VecDeque<Duration>,
    latency_capacity: usize,
}

impl Default for Stats {
    fn default() -> Self {
        Self::new(QUEUE.batch.latency_samples)
    }
}

impl Stats {
    pub fn new(latency_capacity: usize) -> Self {
        let latency_capacity = latency_capacity.max(1);
        Self {
            total_requests: 0,
            completed: 0,
            failed: 0,
            cached: 0,
            rate_limit_hits: 0,
            latencies: VecDeque::with_capacity(latency_capacity),
            latency_capacity,
        }
    }

    pub fn record_latency(&mut self, latency: Duration) {
        if self.latencies.len() == self.latency_capacity {
            self.latencies.pop_front();
        }
        self.latencies.push_back(latency);
    }

    pub fn average_latency(&self) -> Duration {
        if self.latencies.is_empty() {
            return Duration::ZERO;
        }
        self.latencies.iter().sum::<Duration>() / self.latencies.len() as u32
    }

    /// Share of submissions answered from cache, in [0, 1].
    pub fn efficiency(&self) -> f64 {
        self.cached as f64 / self.total_requests.max(1) as f64
    }
}

/// Point-in-time view of the queue for dashboards and logs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueueStatus {
    pub lanes: LaneCounts,
    pub total_pending: usize,
    pub total_requests: u64,
    pub completed: u64,
    pub failed: u64,
    pub cached: u64,
    pub rate_limit_hits: u64,
    pub requests_last_minute: usize,
    pub cache_size: usize,
    /// Lookups answered by, and missed by, the TTL cache
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub avg_response_secs: f64,
    pub request_interval_secs: f64,
    pub efficiency: f64,
}

#[derive(Tabled)]
struct StatusRow {
    #[tabled(rename = "Metric")]
    metric: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

impl QueueStatus {
    pub fn efficiency_pct(&self) -> f64 {
        self.efficiency * 100.0
    }

    pub fn render_table(&self) -> String {
        let rows = vec![
            StatusRow {
                metric: "Pending (high/normal/low)",
                value: format!(
                    "{} ({}/{}/{})",
                    self.total_pending, self.lanes.high, self.lanes.normal, self.lanes.low
                ),
            },
            StatusRow {
                metric: "Submitted",
                value: self.total_requests.to_string(),
            },
            StatusRow {
                metric: "Completed",
                value: self.completed.to_string(),
            },
            StatusRow {
                metric: "Failed attempts",
                value: self.failed.to_string(),
            },
            StatusRow {
                metric: "Served from cache",
                value: self.cached.to_string(),
            },
            StatusRow {
                metric: "Rate limit hits",
                value: self.rate_limit_hits.to_string(),
            },
            StatusRow {
                metric: "Calls in last 60s",
                value: self.requests_last_minute.to_string(),
            },
            StatusRow {
                metric: "Cache entries",
                value: self.cache_size.to_string(),
            },
            StatusRow {
                metric: "Cache hits/misses",
                value: format!("{}/{}", self.cache_hits, self.cache_misses),
            },
            StatusRow {
                metric: "Avg response",
                value: format!("{:.2}s", self.avg_response_secs),
            },
            StatusRow {
                metric: "Request interval",
                value: format!("{:.2}s", self.request_interval_secs),
            },
            StatusRow {
                metric: "Cache efficiency",
                value: format!("{:.1}%", self.efficiency_pct()),
            },
        ];
        Table::new(rows).with(Style::rounded()).to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TuningAction {
    SlowedDown { from: Duration, to: Duration },
    SpedUp { from: Duration, to: Duration },
    Unchanged,
}

/// Crude proportional controller for the pacing interval. Compares counters
/// against the previous check, so it must be called periodically by the owner.
#[derive(Debug, Default)]
pub struct AutoTuner {
    last_hits: u64,
    last_completed: u64,
}

impl AutoTuner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn adjust(
        &mut self,
        stats: &Stats,
        current: Duration,
        (floor, ceiling): (Duration, Duration),
    ) -> (Duration, TuningAction) {
        let new_hits = stats.rate_limit_hits.saturating_sub(self.last_hits);
        let new_completions = stats.completed.saturating_sub(self.last_completed);
        self.last_hits = stats.rate_limit_hits;
        self.last_completed = stats.completed;

        let next = if new_hits > QUEUE.tuner.hit_threshold {
            current.mul_f64(QUEUE.tuner.slow_down_factor).min(ceiling)
        } else if new_hits == 0 && new_completions > QUEUE.tuner.completion_threshold {
            current.mul_f64(QUEUE.tuner.speed_up_factor).max(floor)
        } else {
            return (current, TuningAction::Unchanged);
        };

        let action = match next.cmp(&current) {
            std::cmp::Ordering::Greater => TuningAction::SlowedDown {
                from: current,
                to: next,
            },
            std::cmp::Ordering::Less => TuningAction::SpedUp {
                from: current,
                to: next,
            },
            std::cmp::Ordering::Equal => TuningAction::Unchanged,
        };
        (next, action)
    }
}
