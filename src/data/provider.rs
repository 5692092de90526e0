use {
    crate::{
        config::COINGECKO,
        domain::{CoinMarket, CoinWindow, MarketChart},
    },
    anyhow::{Context, Result},
    async_trait::async_trait,
    reqwest::Client,
    std::time::Duration,
};

#[cfg(debug_assertions)]
use crate::config::DF;

/// Abstract interface for fetching market data.
///
/// Implementations issue exactly one provider call per method invocation and
/// must only be driven from queue operations, never called directly.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// One page of coins ordered by 24h volume.
    async fn fetch_top_coins(&self, per_page: u32, page: u32) -> Result<Vec<CoinMarket>>;

    /// Price, market cap and volume history for one coin.
    async fn fetch_market_chart(&self, window: &CoinWindow) -> Result<MarketChart>;
}

pub struct CoinGeckoProvider {
    client: Client,
    base_url: String,
}

impl CoinGeckoProvider {
    pub fn new() -> Result<Self> {
        Self::with_base_url(COINGECKO.endpoint.base_url)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(COINGECKO.client.user_agent)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl MarketDataProvider for CoinGeckoProvider {
    async fn fetch_top_coins(&self, per_page: u32, page: u32) -> Result<Vec<CoinMarket>> {
        let url = format!("{}/coins/markets", self.base_url);
        #[cfg(debug_assertions)]
        if DF.log_provider {
            log::info!("GET {} (per_page {}, page {})", url, per_page, page);
        }

        let per_page = per_page.to_string();
        let page = page.to_string();
        let coins = self
            .client
            .get(&url)
            .query(&[
                ("vs_currency", COINGECKO.endpoint.vs_currency),
                ("order", "volume_desc"),
                ("per_page", per_page.as_str()),
                ("page", page.as_str()),
                ("sparkline", "false"),
                (
                    "price_change_percentage",
                    COINGECKO.endpoint.price_change_windows,
                ),
            ])
            .timeout(Duration::from_secs(COINGECKO.client.markets_timeout_secs))
            .send()
            .await
            .context("coins/markets request failed")?
            .error_for_status()
            .context("coins/markets returned an error status")?
            .json::<Vec<CoinMarket>>()
            .await
            .context("coins/markets body was not a coin listing")?;

        Ok(coins)
    }

    async fn fetch_market_chart(&self, window: &CoinWindow) -> Result<MarketChart> {
        let url = format!("{}/coins/{}/market_chart", self.base_url, window.coin_id);
        #[cfg(debug_assertions)]
        if DF.log_provider {
            log::info!("GET {} [{}]", url, window);
        }

        let days = window.days.to_string();
        let chart = self
            .client
            .get(&url)
            .query(&[
                ("vs_currency", COINGECKO.endpoint.vs_currency),
                ("days", days.as_str()),
                ("interval", window.interval()),
            ])
            .timeout(Duration::from_secs(COINGECKO.client.chart_timeout_secs))
            .send()
            .await
            .with_context(|| format!("market_chart request failed for {}", window))?
            .error_for_status()
            .with_context(|| format!("market_chart returned an error status for {}", window))?
            .json::<MarketChart>()
            .await
            .with_context(|| format!("market_chart body malformed for {}", window))?;

        Ok(chart)
    }
}
