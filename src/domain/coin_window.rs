use serde::{Deserialize, Serialize};

use crate::config::COINGECKO;

/// A coin plus the look-back window of a history request.
#[derive(Serialize, Deserialize, Debug, Clone, Hash, Eq, PartialEq)]
pub struct CoinWindow {
    pub coin_id: String,
    pub days: u32,
}

impl CoinWindow {
    pub fn new(coin_id: impl Into<String>, days: u32) -> Self {
        Self {
            coin_id: coin_id.into(),
            days,
        }
    }

    /// Provider granularity for this window.
    pub fn interval(&self) -> &'static str {
        if self.days <= COINGECKO.limits.hourly_max_days {
            "hourly"
        } else {
            "daily"
        }
    }

    pub fn cache_key(&self) -> String {
        format!("historical_{}_{}", self.coin_id, self.days)
    }
}

impl std::fmt::Display for CoinWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{} ({}d, {})", self.coin_id, self.days, self.interval())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_switches_after_a_week() {
        assert_eq!(CoinWindow::new("bitcoin", 7).interval(), "hourly");
        assert_eq!(CoinWindow::new("bitcoin", 30).interval(), "daily");
    }

    #[test]
    fn test_cache_key() {
        assert_eq!(
            CoinWindow::new("ethereum", 30).cache_key(),
            "historical_ethereum_30"
        );
    }
}
