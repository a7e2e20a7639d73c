use tracing_subscriber::EnvFilter;

/// Builds the filter for `level`, applied to this crate only so dependency
/// noise (hyper, reqwest) stays at warn.
pub fn default_filter(level: &str) -> String {
    format!("warn,planner={}", level.trim().to_ascii_lowercase())
}

/// Initialize tracing at `level` (e.g. `"info"`, `"debug"`).
///
/// `RUST_LOG` env var overrides the configured level if set.
pub fn init(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(level)));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
