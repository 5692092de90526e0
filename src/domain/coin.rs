use serde::{Deserialize, Serialize};

/// One row of the `/coins/markets` listing. The provider sends `null` for
/// plenty of these on thin or new coins, hence the options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinMarket {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub current_price: Option<f64>,
    pub market_cap: Option<f64>,
    pub market_cap_rank: Option<u32>,
    pub total_volume: Option<f64>,
    pub high_24h: Option<f64>,
    pub low_24h: Option<f64>,
    pub price_change_percentage_24h: Option<f64>,
    #[serde(default, rename = "price_change_percentage_7d_in_currency")]
    pub price_change_percentage_7d: Option<f64>,
    #[serde(default, rename = "price_change_percentage_30d_in_currency")]
    pub price_change_percentage_30d: Option<f64>,
    pub last_updated: Option<String>,
}

impl CoinMarket {
    pub fn display_symbol(&self) -> String {
        self.symbol.to_uppercase()
    }
}
