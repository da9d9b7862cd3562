//! Command-line options.
//!
//! Flags are parsed once in `main` and folded into a [`GatewayConfig`];
//! nothing downstream reads process-wide state.

use std::path::PathBuf;

use clap::Parser;

use crate::config::loader::{read_config, ConfigError};
use crate::config::schema::{GatewayConfig, Stage, TlsConfig};
use crate::config::validation::validate_config;

#[derive(Debug, Clone, Parser)]
#[command(name = "request-meter")]
#[command(version, about = "Metering HTTP gateway", long_about = None)]
pub struct Options {
    /// TOML configuration file; built-in defaults are used when omitted.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Listen host.
    #[arg(long)]
    pub host: Option<String>,

    /// Listen port.
    #[arg(long)]
    pub port: Option<u16>,

    /// Certificate file; HTTPS downgrades to HTTP if empty or missing.
    #[arg(long)]
    pub certfile: Option<String>,

    /// Key file; HTTPS downgrades to HTTP if empty or missing.
    #[arg(long)]
    pub keyfile: Option<String>,

    /// Runtime stage.
    #[arg(long, value_enum)]
    pub stage: Option<Stage>,
}

impl Options {
    /// Overlay flags on `config`. Flags win over file values.
    pub fn apply(&self, config: &mut GatewayConfig) {
        if let Some(host) = &self.host {
            config.listener.host = host.clone();
        }
        if let Some(port) = self.port {
            config.listener.port = port;
        }
        if self.certfile.is_some() || self.keyfile.is_some() {
            let current = config.listener.tls.take();
            let (cert, key) = current
                .map(|tls| (tls.cert_file, tls.key_file))
                .unwrap_or_default();
            config.listener.tls = Some(TlsConfig {
                cert_file: self.certfile.clone().unwrap_or(cert),
                key_file: self.keyfile.clone().unwrap_or(key),
            });
        }
        if let Some(stage) = self.stage {
            config.stage = stage;
        }
    }

    /// Read the config file (if any), apply flags, validate the result.
    pub fn into_config(self) -> Result<GatewayConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => read_config(path)?,
            None => GatewayConfig::default(),
        };
        self.apply(&mut config);
        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}
