use {
    crate::{
        config::QUEUE,
        data::{MarketService, expect_history},
        domain::{CoinMarket, MarketChart, PricePoint},
        queue::{QueueStatus, QueueWorker},
        utils::{
            epoch_ms_to_utc, format_currency, format_duration, format_optional, format_percentage,
        },
    },
    anyhow::Result,
    std::time::{Duration, Instant},
    tabled::{Table, Tabled, settings::Style},
    tokio::sync::mpsc,
};

#[derive(Tabled)]
struct CoinRow {
    #[tabled(rename = "#")]
    rank: String,
    #[tabled(rename = "Coin")]
    name: String,
    #[tabled(rename = "Price")]
    price: String,
    #[tabled(rename = "24h")]
    change_24h: String,
    #[tabled(rename = "7d")]
    change_7d: String,
    #[tabled(rename = "Volume")]
    volume: String,
}

impl From<&CoinMarket> for CoinRow {
    fn from(coin: &CoinMarket) -> Self {
        Self {
            rank: coin
                .market_cap_rank
                .map(|r| r.to_string())
                .unwrap_or_else(|| "-".to_string()),
            name: format!("{} ({})", coin.name, coin.display_symbol()),
            price: format_optional(coin.current_price, format_currency),
            change_24h: format_optional(coin.price_change_percentage_24h, format_percentage),
            change_7d: format_optional(coin.price_change_percentage_7d, format_percentage),
            volume: format_optional(coin.total_volume, format_currency),
        }
    }
}

#[derive(Tabled)]
struct HistoryRow {
    #[tabled(rename = "Coin")]
    coin: String,
    #[tabled(rename = "Points")]
    points: usize,
    #[tabled(rename = "From")]
    from: String,
    #[tabled(rename = "To")]
    to: String,
    #[tabled(rename = "Change")]
    change: String,
}

impl HistoryRow {
    fn new(coin: &str, chart: &MarketChart) -> Self {
        let stamp = |p: Option<PricePoint>| {
            p.map(|p| format!("{} @ {}", format_currency(p.price), epoch_ms_to_utc(p.timestamp_ms)))
                .unwrap_or_else(|| "-".to_string())
        };
        Self {
            coin: coin.to_string(),
            points: chart.prices.len(),
            from: stamp(chart.first()),
            to: stamp(chart.last()),
            change: format_optional(chart.change_pct(), format_percentage),
        }
    }
}

pub fn render_coins(coins: &[CoinMarket]) -> String {
    Table::new(coins.iter().map(CoinRow::from))
        .with(Style::rounded())
        .to_string()
}

fn print_status(status: &QueueStatus) {
    println!("{}", status.render_table());
}

pub async fn run_top(service: &MarketService, limit: u32) -> Result<()> {
    let coins = service.top_coins(limit).await?;
    println!("{}", render_coins(&coins));
    print_status(&service.queue().status().await);
    Ok(())
}

pub async fn run_history(service: &MarketService, coin_id: &str, days: u32) -> Result<()> {
    let chart = service.historical(coin_id, days).await?;
    let row = HistoryRow::new(coin_id, &chart);
    println!("{}", Table::new([row]).with(Style::rounded()));
    print_status(&service.queue().status().await);
    Ok(())
}

/// Listing first, then histories for the leaders, resolved by a background
/// worker. Repeat rounds are answered from cache until entries expire.
pub async fn run_scan(service: &MarketService, top: u32, days: u32, rounds: u32) -> Result<()> {
    let coins = service.top_coins(top).await?;
    let ids: Vec<String> = coins.iter().take(top as usize).map(|c| c.id.clone()).collect();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let worker = QueueWorker::spawn(
        service.queue().clone(),
        QUEUE.batch.batch_size,
        Duration::from_secs(QUEUE.batch.timeout_secs),
        Some(tx),
    );

    let drain_reports = tokio::spawn(async move {
        while let Some(report) = rx.recv().await {
            log::info!(
                "📦 Batch done: {} ok, {} failed, {} still queued",
                report.successes(),
                report.failures(),
                report.remaining
            );
        }
    });

    for round in 1..=rounds.max(1) {
        let round_started = Instant::now();
        let tickets = service.queue_histories(&ids, days).await?;
        service.queue().optimize().await;

        let mut rows = Vec::with_capacity(tickets.len());
        for (coin_id, ticket) in ids.iter().zip(tickets) {
            match expect_history(ticket.wait().await) {
                Ok(chart) => rows.push(HistoryRow::new(coin_id, &chart)),
                Err(e) => log::warn!("Skipping {}: {:#}", coin_id, e),
            }
        }

        println!(
            "Round {}/{} ({})",
            round,
            rounds.max(1),
            format_duration(round_started.elapsed())
        );
        println!("{}", Table::new(rows).with(Style::rounded()));

        service.queue().auto_adjust_rates().await;
        service.queue().purge_expired_cache().await;
        print_status(&service.queue().status().await);
    }

    service.queue().shutdown().await;
    worker.join().await;
    if let Err(e) = drain_reports.await {
        log::error!("Report listener failed: {}", e);
    }
    Ok(())
}
