#[macro_export]
macro_rules! trace_time {
    // $threshold_micros: Enter 500 for 0.5ms, 1_000_000 for 1s, etc.
    ($name:expr, $threshold_micros:expr, $block:block) => {{
        if $crate::config::DF.log_performance {
            let start = ::std::time::Instant::now();
            let result = $block;
            let micros = start.elapsed().as_micros();
            if micros > $threshold_micros {
                let mode = if cfg!(debug_assertions) {
                    "DEBUG"
                } else {
                    "RELEASE"
                };
                log::warn!(
                    "🐢 SLOW [{}]: '{}' took {:.3}ms (Threshold: {:.3}ms)",
                    mode,
                    $name,
                    micros as f64 / 1000.0,
                    $threshold_micros as f64 / 1000.0
                );
            }
            result
        } else {
            $block
        }
    }};
}
