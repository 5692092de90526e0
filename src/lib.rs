#![allow(clippy::collapsible_if)]
#![allow(clippy::type_complexity)]

// Core modules
pub mod app;
pub mod config;
pub mod data;
pub mod domain;
pub mod queue;
pub mod utils;

pub use config::{COINGECKO, QUEUE, QueueConfig};
pub use data::{CoinGeckoProvider, MarketDataProvider, MarketPayload, MarketService};
pub use queue::{Priority, QueueError, QueueManager, QueueStatus, WorkItem};

// CLI argument parsing
use {
    clap::{Parser, Subcommand},
    std::path::PathBuf,
};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// JSON file overriding the queue defaults
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Top coins by 24h volume
    Top {
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
    /// Price history for one coin
    History {
        coin: String,
        #[arg(long, default_value_t = 30)]
        days: u32,
    },
    /// Listing plus histories for the leaders, repeated to show cache reuse
    Scan {
        #[arg(long, default_value_t = 10)]
        top: u32,
        #[arg(long, default_value_t = 7)]
        days: u32,
        #[arg(long, default_value_t = 2)]
        rounds: u32,
    },
}

impl Cli {
    pub fn queue_config(&self) -> anyhow::Result<QueueConfig> {
        match &self.config {
            Some(path) => QueueConfig::from_json_file(path),
            None => Ok(QueueConfig::default()),
        }
    }
}

/// Build the queue and provider, then dispatch one command.
pub async fn run(args: Cli) -> anyhow::Result<()> {
    let config = args.queue_config()?;
    if config.max_requests_per_minute > COINGECKO.limits.free_tier_limit {
        log::warn!(
            "⚠ {} requests/min exceeds the CoinGecko free tier ({}); expect 429s",
            config.max_requests_per_minute,
            COINGECKO.limits.free_tier_limit
        );
    }
    let queue = QueueManager::new(config)?;
    let provider = std::sync::Arc::new(CoinGeckoProvider::new()?);
    let service = MarketService::new(queue.clone(), provider);

    let result = match &args.command {
        Command::Top { limit } => app::run_top(&service, *limit).await,
        Command::History { coin, days } => app::run_history(&service, coin, *days).await,
        Command::Scan { top, days, rounds } => app::run_scan(&service, *top, *days, *rounds).await,
    };

    queue.shutdown().await;
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_scan_defaults() {
        let cli = Cli::try_parse_from(["coin-radar", "scan", "--top", "5"]).unwrap();
        match cli.command {
            Command::Scan { top, days, rounds } => assert_eq!((top, days, rounds), (5, 7, 2)),
            other => panic!("unexpected command {:?}", other),
        }
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_cli_global_config_flag() {
        let cli =
            Cli::try_parse_from(["coin-radar", "history", "bitcoin", "--config", "q.json"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("q.json")));
    }
}
