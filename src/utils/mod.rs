mod format;
mod perf;
pub mod time_utils;

pub use format::{format_currency, format_optional, format_percentage};
pub use time_utils::{epoch_ms_to_utc, format_duration};
