//! Configuration schema definitions.
//!
//! Every section is `#[serde(default)]`, so a file only needs the keys it
//! changes.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::error::{ConfigError, ConfigResult};
use crate::client::DEFAULT_BASE_URL;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Service under test
    pub service: ServiceConfig,
    /// Feature-file runner
    pub runner: RunnerConfig,
    /// Stub service
    pub stub: StubConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    /// Check values that serde cannot check on its own.
    pub fn validate(&self) -> ConfigResult<()> {
        let url = url::Url::parse(&self.service.base_url)
            .map_err(|e| ConfigError::validation("service.base_url", e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::validation(
                "service.base_url",
                format!("unsupported scheme '{}'", url.scheme()),
            ));
        }
        if self.stub.host.trim().is_empty() {
            return Err(ConfigError::validation("stub.host", "must not be empty"));
        }
        Ok(())
    }
}

/// Service under test.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Base URL the connect and disconnect endpoints live under
    pub base_url: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

/// Feature-file runner section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Feature file or directory to run when none is given
    pub features: PathBuf,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            features: PathBuf::from("features"),
        }
    }
}

/// Stub service section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StubConfig {
    /// Host address to bind to
    pub host: String,
    /// Port number for the stub HTTP server
    pub port: u16,
    /// How the simulated ECU answers a connect
    pub behaviour: EcuBehaviour,
    /// ECU identifier reported once initialised
    pub ecu_id: String,
    /// IAC position reported once initialised
    pub iac_position: i32,
}

impl Default for StubConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8081,
            behaviour: EcuBehaviour::Responsive,
            ecu_id: "99 00 03 03".to_string(),
            iac_position: 30,
        }
    }
}

/// Simulated ECU response to a connect request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum EcuBehaviour {
    /// Port opens and the initialisation handshake completes
    #[default]
    Responsive,
    /// Port opens but the ECU never answers the handshake
    ConnectOnly,
    /// Port cannot be opened
    NoResponse,
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Log format: "json", "pretty", "compact"
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format
    Json,
    /// Pretty format with colors
    #[default]
    Pretty,
    /// Compact format
    Compact,
}
