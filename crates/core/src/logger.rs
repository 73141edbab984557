use std::str::FromStr;

use tracing::warn;
use tracing_subscriber::{Layer, layer::SubscriberExt, util::SubscriberInitExt};

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human readable lines with timestamp, level and target.
    #[default]
    Full,
    /// Human readable lines without the target.
    Compact,
    /// One JSON object per event.
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "full" => Ok(Self::Full),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{other}', expected full, compact or json")),
        }
    }
}

fn parse_level(log_level: &str) -> Option<tracing::Level> {
    match log_level.to_lowercase().as_str() {
        "trace" => Some(tracing::Level::TRACE),
        "debug" => Some(tracing::Level::DEBUG),
        "info" => Some(tracing::Level::INFO),
        "warn" => Some(tracing::Level::WARN),
        "error" => Some(tracing::Level::ERROR),
        _ => None,
    }
}

/// Installs the global subscriber. `RUST_LOG` wins over `log_level` when set.
pub fn init_logger(log_level: &str) {
    init_logger_with_format(log_level, LogFormat::Full);
}

/// Like [`init_logger`] with an explicit output format.
pub fn init_logger_with_format(log_level: &str, format: LogFormat) {
    let level = parse_level(log_level);

    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(level.unwrap_or(tracing::Level::INFO).to_string())
    });
    let fmt = match format {
        LogFormat::Full => tracing_subscriber::fmt::layer().boxed(),
        LogFormat::Compact => tracing_subscriber::fmt::layer().compact().with_target(false).boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer().json().boxed(),
    };

    tracing_subscriber::registry().with(filter).with(fmt).init();

    if level.is_none() {
        warn!("Invalid log level '{}', defaulting to 'info'", log_level);
    }
}
