use anyhow::Context;
use clap::ValueEnum;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

#[derive(Clone, Debug, Default, ValueEnum)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Installs the global subscriber. Logs go to stderr; `RUST_LOG` overrides
/// the default `info` level.
pub fn setup_logs(log_format: LogFormat) -> anyhow::Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env()
        .context("Invalid `RUST_LOG` environment variable")?;

    let log_layer = match log_format {
        LogFormat::Pretty => Box::new(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            as Box<dyn Layer<_> + Send + Sync>,
        LogFormat::Json => Box::new(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr),
        ),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(log_layer)
        .try_init()
        .context("Failed to set up logs")
}
