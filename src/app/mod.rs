mod commands;

pub use commands::{render_coins, run_history, run_scan, run_top};
