use {
    crate::{
        config::COINGECKO,
        data::MarketDataProvider,
        domain::{CoinMarket, CoinWindow, MarketChart},
        queue::{Outcome, Priority, QueueError, QueueManager, Ticket, WorkItem},
    },
    anyhow::{Result, anyhow, bail},
    std::{sync::Arc, time::Duration},
};

/// Everything the market service pushes through the queue.
#[derive(Debug, Clone)]
pub enum MarketPayload {
    TopCoins(Arc<Vec<CoinMarket>>),
    History(Arc<MarketChart>),
}

/// Market data access for the dashboard. Every provider call is wrapped in a
/// `WorkItem` and resolved through the shared queue (cache, limiter, retries).
#[derive(Clone)]
pub struct MarketService {
    queue: QueueManager<MarketPayload>,
    provider: Arc<dyn MarketDataProvider>,
}

impl MarketService {
    pub fn new(queue: QueueManager<MarketPayload>, provider: Arc<dyn MarketDataProvider>) -> Self {
        Self { queue, provider }
    }

    pub fn queue(&self) -> &QueueManager<MarketPayload> {
        &self.queue
    }

    /// High priority: the listing drives everything else on screen.
    /// The provider serves at most one page per call, so `limit` is clamped.
    pub fn top_coins_request(&self, limit: u32) -> WorkItem<MarketPayload> {
        let limit = limit.clamp(1, COINGECKO.limits.coins_per_page);
        let provider = Arc::clone(&self.provider);
        let key = format!("top_coins_{}", limit);

        WorkItem::new(key.clone(), move || {
            let provider = Arc::clone(&provider);
            async move {
                let coins = provider.fetch_top_coins(limit, 1).await?;
                Ok(MarketPayload::TopCoins(Arc::new(coins)))
            }
        })
        .priority(Priority::High)
        .cache_key(key)
        .ttl(Duration::from_secs(COINGECKO.ttl.coins_list_secs))
        .max_attempts(COINGECKO.retry.coins_list_attempts)
    }

    pub fn history_request(&self, window: CoinWindow) -> WorkItem<MarketPayload> {
        let provider = Arc::clone(&self.provider);
        let key = window.cache_key();

        WorkItem::new(key.clone(), move || {
            let provider = Arc::clone(&provider);
            let window = window.clone();
            async move {
                let chart = provider.fetch_market_chart(&window).await?;
                Ok(MarketPayload::History(Arc::new(chart)))
            }
        })
        .priority(Priority::Normal)
        .cache_key(key)
        .ttl(Duration::from_secs(COINGECKO.ttl.coin_history_secs))
        .max_attempts(COINGECKO.retry.coin_history_attempts)
    }

    pub async fn top_coins(&self, limit: u32) -> Result<Arc<Vec<CoinMarket>>> {
        let outcome = self.queue.submit_and_wait(self.top_coins_request(limit)).await?;
        expect_top_coins(outcome)
    }

    pub async fn historical(&self, coin_id: &str, days: u32) -> Result<Arc<MarketChart>> {
        let window = CoinWindow::new(coin_id, days);
        let outcome = self.queue.submit_and_wait(self.history_request(window)).await?;
        expect_history(outcome)
    }

    /// Queue histories without waiting; a worker or later batches resolve them.
    pub async fn queue_histories(
        &self,
        coin_ids: &[String],
        days: u32,
    ) -> Result<Vec<Ticket<MarketPayload>>, QueueError> {
        let mut tickets = Vec::with_capacity(coin_ids.len());
        for coin_id in coin_ids {
            let request = self.history_request(CoinWindow::new(coin_id.as_str(), days));
            tickets.push(self.queue.submit_tracked(request).await?);
        }
        Ok(tickets)
    }
}

pub fn expect_top_coins(outcome: Outcome<MarketPayload>) -> Result<Arc<Vec<CoinMarket>>> {
    match outcome.map_err(|e| anyhow!(e))? {
        MarketPayload::TopCoins(coins) => Ok(coins),
        other => bail!("expected a coin listing, got {:?}", other),
    }
}

pub fn expect_history(outcome: Outcome<MarketPayload>) -> Result<Arc<MarketChart>> {
    match outcome.map_err(|e| anyhow!(e))? {
        MarketPayload::History(chart) => Ok(chart),
        other => bail!("expected a price history, got {:?}", other),
    }
}
