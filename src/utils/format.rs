/// Compact dollar amounts: `$1.23B`, `$4.50M`, `$7.80K`, `$0.42`.
pub fn format_currency(value: f64) -> String {
    let abs = value.abs();
    if abs >= 1e9 {
        format!("${:.2}B", value / 1e9)
    } else if abs >= 1e6 {
        format!("${:.2}M", value / 1e6)
    } else if abs >= 1e3 {
        format!("${:.2}K", value / 1e3)
    } else {
        format!("${:.2}", value)
    }
}

pub fn format_percentage(value: f64) -> String {
    format!("{:.2}%", value)
}

/// Missing provider numbers show as a dash.
pub fn format_optional(value: Option<f64>, format: fn(f64) -> String) -> String {
    value.map(format).unwrap_or_else(|| "-".to_string())
}
