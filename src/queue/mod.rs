//! Request scheduling core: every outbound provider call goes through here.
//!
//! Callers submit `WorkItem`s into priority lanes; batch runs resolve them
//! from the TTL cache or, once the sliding-window limiter admits a call, from
//! the network. Failures are retried from the low lane and finally reported
//! as `Err(String)` outcomes.

mod cache;
mod error;
mod executor;
mod item;
mod lanes;
mod manager;
mod rate_limiter;
mod retry;
mod telemetry;
mod worker;

pub use cache::TtlCache;
pub use error::QueueError;
pub use executor::BatchReport;
pub use item::{ItemStatus, Operation, Outcome, Priority, Ticket, WorkItem};
pub use lanes::{LaneCounts, LaneSet};
pub use manager::QueueManager;
pub use rate_limiter::{Admission, RateLimiter, WINDOW};
pub use retry::{RetryDecision, RetryPolicy};
pub use telemetry::{AutoTuner, QueueStatus, Stats, TuningAction};
pub use worker::QueueWorker;
