//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber once at startup
//! - Pick the log level from `RUST_LOG` or the config
//! - Pick pretty or JSON output from the stage and config
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - JSON format for production, pretty format for development

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{GatewayConfig, LogFormat, Stage};

/// Effective log format for `config`.
pub fn log_format(config: &GatewayConfig) -> LogFormat {
    if config.stage == Stage::Prod {
        LogFormat::Json
    } else {
        config.observability.log_format
    }
}

/// Filter directive used when `RUST_LOG` is not set.
pub fn default_directive(config: &GatewayConfig) -> String {
    format!(
        "request_meter={level},tower_http={level}",
        level = config.observability.log_level
    )
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(config: &GatewayConfig) -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(config)));

    let registry = tracing_subscriber::registry().with(filter);
    match log_format(config) {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init(),
    }
}
