//! Configuration module for rosco_bdd.
//!
//! This module provides TOML-based configuration with environment variable overrides.
//!
//! # Configuration Resolution
//!
//! Configuration is loaded from the following locations (in order of priority):
//!
//! 1. `--config <FILE>` on the command line
//! 2. `ROSCO_BDD_CONFIG` environment variable (explicit path)
//! 3. `./rosco_bdd.toml` (current directory)
//! 4. `rosco_bdd/rosco_bdd.toml` under the platform config directory
//! 5. Built-in defaults (no file required)
//!
//! # Environment Overrides
//!
//! Any configuration value can be overridden via environment variables.
//! The pattern is: `ROSCO_BDD_<SECTION>_<KEY>`
//!
//! Examples:
//! - `ROSCO_BDD_SERVICE_BASE_URL=http://localhost:8081`
//! - `ROSCO_BDD_STUB_PORT=18081`
//!
//! # Example
//!
//! ```rust,ignore
//! use rosco_bdd::config::ConfigLoader;
//!
//! let loader = ConfigLoader::load()?;
//! println!("Service: {}", loader.config().service.base_url);
//! ```

mod error;
mod loader;
mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;
pub use schema::{
    Config, EcuBehaviour, LogFormat, LoggingConfig, RunnerConfig, ServiceConfig, StubConfig,
};
