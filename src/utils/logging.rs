use tracing::Level;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` takes precedence when set; otherwise `level` (the configured
/// `logging.level`) applies to everything. Later calls are no-ops.
pub fn init(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::default().add_directive(LevelFilter::from_level(parse_level(level)).into())
    });

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false).compact())
        .try_init();
}

/// Unknown names fall back to `info`.
pub(crate) fn parse_level(name: &str) -> Level {
    name.trim().parse().unwrap_or(Level::INFO)
}
