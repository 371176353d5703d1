use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

pub(crate) const LOG_ENV: &str = "GIFBOT_LOG";

pub(crate) fn init_tracing() {
    let directives = std::env::var(LOG_ENV)
        .or_else(|_| std::env::var(EnvFilter::DEFAULT_ENV))
        .ok();

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(directives.as_deref()))
        .with_target(false)
        .compact()
        .init();
}

/// Blank or missing directives log at INFO.
pub(crate) fn log_filter(directives: Option<&str>) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .parse_lossy(directives.map(str::trim).unwrap_or_default())
}
