use serde::{Deserialize, Serialize};

/// Body of `/coins/{id}/market_chart`: `[epoch_ms, value]` pairs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketChart {
    #[serde(default)]
    pub prices: Vec<[f64; 2]>,
    #[serde(default)]
    pub market_caps: Vec<[f64; 2]>,
    #[serde(default)]
    pub total_volumes: Vec<[f64; 2]>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub timestamp_ms: i64,
    pub price: f64,
}

impl MarketChart {
    pub fn points(&self) -> Vec<PricePoint> {
        self.prices
            .iter()
            .map(|&[ts, price]| PricePoint {
                timestamp_ms: ts as i64,
                price,
            })
            .collect()
    }

    pub fn first(&self) -> Option<PricePoint> {
        self.points().first().copied()
    }

    pub fn last(&self) -> Option<PricePoint> {
        self.points().last().copied()
    }

    /// Percent move from the first to the last price in the window.
    pub fn change_pct(&self) -> Option<f64> {
        let (first, last) = (self.first()?, self.last()?);
        if first.price == 0.0 {
            return None;
        }
        Some((last.price - first.price) / first.price * 100.0)
    }
}
