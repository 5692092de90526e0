mod market_service;
mod provider;

pub use {
    market_service::{MarketPayload, MarketService, expect_history, expect_top_coins},
    provider::{CoinGeckoProvider, MarketDataProvider},
};
