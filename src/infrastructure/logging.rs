//! Tracing subscriber setup

use tracing::Subscriber;
use tracing_subscriber::{
    Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::config::{LogFormat, LoggingConfig};

/// Filter from `RUST_LOG`, falling back to the configured level
fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level))
}

fn fmt_layer<S>(format: LogFormat) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    match format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_span_events(FmtSpan::CLOSE)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .pretty()
            .with_target(true)
            .with_span_events(FmtSpan::CLOSE)
            .boxed(),
    }
}

/// Subscriber for the configured level and format, not yet installed
pub fn build_subscriber(config: &LoggingConfig) -> impl Subscriber + Send + Sync + 'static {
    tracing_subscriber::registry()
        .with(env_filter(config))
        .with(fmt_layer(config.format))
}

/// Install the global subscriber
///
/// Fails if a global subscriber is already set.
pub fn init_logging(config: &LoggingConfig) -> Result<(), tracing_subscriber::util::TryInitError> {
    build_subscriber(config).try_init()?;

    tracing::info!("Logging initialized with level: {}", config.level);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::Level;

    fn config(format: LogFormat) -> LoggingConfig {
        LoggingConfig {
            level: "debug".to_string(),
            format,
        }
    }

    #[test]
    fn test_subscriber_is_scoped() {
        for format in [LogFormat::Json, LogFormat::Pretty] {
            let subscriber = build_subscriber(&config(format));

            tracing::subscriber::with_default(subscriber, || {
                assert!(tracing::enabled!(Level::ERROR));
            });
        }

        // Outside the scope events go nowhere
        assert!(!tracing::enabled!(Level::ERROR));
    }
}
