use log::LevelFilter;

/// Map the 0..=5 verbosity used by [`AnalysisConfig`](crate::AnalysisConfig)
/// onto a `log` level filter. Out-of-range values saturate.
pub fn level_filter(log_level: i32) -> LevelFilter {
    match log_level {
        i32::MIN..=0 => LevelFilter::Off,
        1 => LevelFilter::Error,
        2 => LevelFilter::Warn,
        3 => LevelFilter::Info,
        4 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Install the `env_logger` backend once; later calls only adjust the level.
///
/// `RUST_LOG` still overrides per-module filters.
pub fn init_logging(log_level: i32) {
    let filter = level_filter(log_level);
    let _ = env_logger::Builder::new()
        .filter_level(filter)
        .parse_default_env()
        .try_init();
    log::set_max_level(filter);
}
