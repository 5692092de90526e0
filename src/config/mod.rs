//! Configuration module for coin-radar.

mod coingecko;
mod debug;
mod queue;

pub use coingecko::{COINGECKO, CoinGeckoConfig};
pub use debug::{DF, LogFlags};
pub use queue::{QUEUE, QueueBlueprint, QueueConfig};
