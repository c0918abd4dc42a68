//! Logging setup

use tracing::level_filters::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Install the global subscriber.
///
/// `RUST_LOG` wins when set; otherwise `info`, or `debug` when `debug` is on.
pub fn init_telemetry(format: LogFormat, debug: bool) -> anyhow::Result<()> {
    let default_level = if debug { LevelFilter::DEBUG } else { LevelFilter::INFO };
    let filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    let layer = match format {
        LogFormat::Text => tracing_subscriber::fmt::layer()
            .with_target(debug)
            .with_line_number(debug)
            .boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(false)
            .with_target(debug)
            .boxed(),
    };

    Registry::default().with(filter).with(layer).try_init()?;
    Ok(())
}
