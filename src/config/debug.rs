//! Debugging feature flags.

pub struct LogFlags {
    /// Every submit, dequeue and requeue
    pub log_queue_events: bool,

    /// Cache hits, misses and expiries
    pub log_cache: bool,

    /// Admission decisions and pacing waits
    pub log_rate_limiter: bool,

    /// Activate trace_time macro (slow provider calls)
    pub log_performance: bool,

    /// Outbound provider URLs
    pub log_provider: bool,
}

pub const DF: LogFlags = LogFlags {
    log_rate_limiter: true,

    log_queue_events: false,
    log_cache: false,
    log_performance: false,
    log_provider: false,
};
