//! Request queue blueprints and the runtime configuration built from them.

use {
    crate::queue::QueueError,
    anyhow::{Context, Result},
    serde::{Deserialize, Serialize},
    std::{fs, path::Path, time::Duration},
};

/// Provider ceiling and call pacing.
pub struct RateDefaults {
    /// Keep under the free tier ceiling (50/min) with some headroom
    pub max_requests_per_minute: u32,
    pub request_interval_secs: f64,
    /// Bounds the auto-tuner may move the interval within
    pub min_interval_secs: f64,
    pub max_interval_secs: f64,
    /// Anything lower gets the client banned quickly
    pub absolute_min_interval_secs: f64,
    /// A gap longer than the whole window is never useful
    pub absolute_max_interval_secs: f64,
    /// Added on top of every window wait
    pub wait_margin_ms: u64,
    pub window_secs: u64,
}

/// Proportional controller thresholds for `auto_adjust_rates`.
pub struct TunerDefaults {
    pub hit_threshold: u64,
    pub completion_threshold: u64,
    pub slow_down_factor: f64,
    pub speed_up_factor: f64,
}

pub struct RetryDefaults {
    pub max_attempts: u32,
}

pub struct CacheDefaults {
    pub default_ttl_secs: u64,
}

pub struct BatchDefaults {
    pub batch_size: usize,
    pub timeout_secs: u64,
    /// How long an idle worker sleeps before looking at the lanes again
    pub idle_poll_ms: u64,
    /// Size of the latency ring used for the running average
    pub latency_samples: usize,
}

/// The Master Queue Configuration
pub struct QueueBlueprint {
    pub rate: RateDefaults,
    pub tuner: TunerDefaults,
    pub retry: RetryDefaults,
    pub cache: CacheDefaults,
    pub batch: BatchDefaults,
}

pub const QUEUE: QueueBlueprint = QueueBlueprint {
    rate: RateDefaults {
        max_requests_per_minute: 45,
        request_interval_secs: 1.5,
        min_interval_secs: 1.0,
        max_interval_secs: 3.0,
        absolute_min_interval_secs: 0.5,
        absolute_max_interval_secs: 60.0,
        wait_margin_ms: 100,
        window_secs: 60,
    },
    tuner: TunerDefaults {
        hit_threshold: 5,
        completion_threshold: 20,
        slow_down_factor: 1.2,
        speed_up_factor: 0.95,
    },
    retry: RetryDefaults { max_attempts: 3 },
    cache: CacheDefaults {
        default_ttl_secs: 300,
    },
    batch: BatchDefaults {
        batch_size: 10,
        timeout_secs: 30,
        idle_poll_ms: 250,
        latency_samples: 100,
    },
};

/// Runtime settings for a `QueueManager`. Fixed once the manager is built,
/// except for the request interval which the auto-tuner moves within bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    pub max_requests_per_minute: u32,
    pub request_interval_secs: f64,
    pub min_interval_secs: f64,
    pub max_interval_secs: f64,
    pub default_ttl_secs: u64,
    pub max_attempts: u32,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_requests_per_minute: QUEUE.rate.max_requests_per_minute,
            request_interval_secs: QUEUE.rate.request_interval_secs,
            min_interval_secs: QUEUE.rate.min_interval_secs,
            max_interval_secs: QUEUE.rate.max_interval_secs,
            default_ttl_secs: QUEUE.cache.default_ttl_secs,
            max_attempts: QUEUE.retry.max_attempts,
        }
    }
}

impl QueueConfig {
    /// Load a (possibly partial) JSON config; missing fields fall back to `QUEUE`.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read queue config {}", path.display()))?;
        let config: QueueConfig = serde_json::from_str(&raw)
            .with_context(|| format!("Malformed queue config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), QueueError> {
        let invalid = |msg: String| Err(QueueError::InvalidConfig(msg));

        if self.max_requests_per_minute == 0 {
            return invalid("max_requests_per_minute must be at least 1".into());
        }
        if self.max_attempts == 0 {
            return invalid("max_attempts must be at least 1".into());
        }
        let intervals = [
            ("request_interval_secs", self.request_interval_secs),
            ("min_interval_secs", self.min_interval_secs),
            ("max_interval_secs", self.max_interval_secs),
        ];
        if let Some((name, value)) = intervals.iter().find(|(_, v)| !v.is_finite()) {
            return invalid(format!("{} must be a finite number of seconds, got {}", name, value));
        }
        if self.max_interval_secs > QUEUE.rate.absolute_max_interval_secs {
            return invalid(format!(
                "max_interval_secs {} is above the {}s ceiling",
                self.max_interval_secs, QUEUE.rate.absolute_max_interval_secs
            ));
        }
        if self.min_interval_secs < QUEUE.rate.absolute_min_interval_secs {
            return invalid(format!(
                "min_interval_secs {} is below the {}s floor",
                self.min_interval_secs, QUEUE.rate.absolute_min_interval_secs
            ));
        }
        if self.min_interval_secs > self.max_interval_secs {
            return invalid(format!(
                "interval bounds are inverted ({} > {})",
                self.min_interval_secs, self.max_interval_secs
            ));
        }
        if !(self.min_interval_secs..=self.max_interval_secs).contains(&self.request_interval_secs)
        {
            return invalid(format!(
                "request_interval_secs {} outside [{}, {}]",
                self.request_interval_secs, self.min_interval_secs, self.max_interval_secs
            ));
        }
        Ok(())
    }

    pub fn request_interval(&self) -> Duration {
        Duration::from_secs_f64(self.request_interval_secs)
    }

    pub fn interval_bounds(&self) -> (Duration, Duration) {
        (
            Duration::from_secs_f64(self.min_interval_secs),
            Duration::from_secs_f64(self.max_interval_secs),
        )
    }

    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = QueueConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_requests_per_minute, 45);
        assert_eq!(config.request_interval(), Duration::from_millis(1500));
        assert_eq!(config.default_ttl(), Duration::from_secs(300));
        assert_eq!(config.max_attempts, 3);
    }

    #[test]
    fn test_rejects_zero_ceiling() {
        let config = QueueConfig {
            max_requests_per_minute: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(QueueError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_rejects_interval_outside_bounds() {
        let config = QueueConfig {
            request_interval_secs: 4.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = QueueConfig {
            min_interval_secs: 0.1,
            request_interval_secs: 0.2,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_unrepresentable_interval() {
        let config: QueueConfig =
            serde_json::from_str(r#"{ "max_interval_secs": 1e300 }"#).unwrap();
        assert!(matches!(
            config.validate(),
            Err(QueueError::InvalidConfig(_))
        ));

        let config = QueueConfig {
            request_interval_secs: 1e300,
            max_interval_secs: 1e300,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = QueueConfig {
            request_interval_secs: f64::NAN,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = QueueConfig {
            max_interval_secs: f64::INFINITY,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_accepts_interval_at_ceiling() {
        let config = QueueConfig {
            max_interval_secs: QUEUE.rate.absolute_max_interval_secs,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
        assert_eq!(config.interval_bounds().1, Duration::from_secs(60));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: QueueConfig =
            serde_json::from_str(r#"{ "max_requests_per_minute": 10 }"#).unwrap();
        assert_eq!(config.max_requests_per_minute, 10);
        assert_eq!(config.max_attempts, QUEUE.retry.max_attempts);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json_file() {
        let path = std::env::temp_dir().join("coin_radar_queue_config_test.json");
        fs::write(&path, r#"{ "request_interval_secs": 2.0, "max_attempts": 5 }"#).unwrap();

        let config = QueueConfig::from_json_file(&path).unwrap();
        assert_eq!(config.request_interval(), Duration::from_secs(2));
        assert_eq!(config.max_attempts, 5);

        let _ = fs::remove_file(&path);
    }
}
