// Domain types and value objects
mod coin;
mod coin_window;
mod price_point;

pub use coin::CoinMarket;
pub use coin_window::CoinWindow;
pub use price_point::{MarketChart, PricePoint};
