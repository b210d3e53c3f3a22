use crate::config::LoggingConfig;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

/// Install the global tracing subscriber. `RUST_LOG` takes precedence over
/// the configured level.
pub fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let stdout_layer = if config.format.eq_ignore_ascii_case("json") {
        fmt::layer().json().with_target(true).boxed()
    } else {
        fmt::layer().with_target(true).boxed()
    };

    if Registry::default().with(filter).with(stdout_layer).try_init().is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
