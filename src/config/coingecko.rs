pub struct EndpointConfig {
    pub base_url: &'static str,
    pub vs_currency: &'static str,
    /// Comma separated windows requested alongside the market listing
    pub price_change_windows: &'static str,
}

pub struct ClientDefaults {
    pub markets_timeout_secs: u64,
    pub chart_timeout_secs: u64,
    pub user_agent: &'static str,
}

/// Cache lifetimes for each kind of response.
pub struct CacheTtls {
    pub coins_list_secs: u64,
    pub coin_history_secs: u64,
}

/// Total attempts per request kind. Histories are cheaper to skip than the listing.
pub struct RetryBudgets {
    pub coins_list_attempts: u32,
    pub coin_history_attempts: u32,
}

pub struct ListingLimits {
    /// Provider enforced requests per minute (free tier)
    pub free_tier_limit: u32,
    pub coins_per_page: u32,
    /// Histories at or below this many days are requested hourly
    pub hourly_max_days: u32,
}

pub struct CoinGeckoConfig {
    pub endpoint: EndpointConfig,
    pub client: ClientDefaults,
    pub ttl: CacheTtls,
    pub retry: RetryBudgets,
    pub limits: ListingLimits,
}

pub const COINGECKO: CoinGeckoConfig = CoinGeckoConfig {
    endpoint: EndpointConfig {
        base_url: "https://api.coingecko.com/api/v3",
        vs_currency: "usd",
        price_change_windows: "24h,7d,30d",
    },
    client: ClientDefaults {
        markets_timeout_secs: 15,
        chart_timeout_secs: 20,
        user_agent: concat!("coin-radar/", env!("CARGO_PKG_VERSION")),
    },
    ttl: CacheTtls {
        coins_list_secs: 300,
        coin_history_secs: 600,
    },
    retry: RetryBudgets {
        coins_list_attempts: 3,
        coin_history_attempts: 2,
    },
    limits: ListingLimits {
        free_tier_limit: 50,
        coins_per_page: 100,
        hourly_max_days: 7,
    },
};
