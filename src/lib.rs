//! Rosco BDD Library
//!
//! Acceptance-test step bindings for the REST API that connects to and
//! initialises a MEMS engine control unit over a serial port.
//!
//! # Modules
//!
//! - `context`: Per-scenario state (serial port, last connect response)
//! - `client`: Blocking HTTP client for `/rosco/connect` and `/rosco/disconnect`
//! - `value`: Text rendering of JSON values used by the assertions
//! - `steps`: Step operations and the static step table
//! - `world`: cucumber world registering the step patterns
//! - `runner`: Feature-file execution
//! - `config`: Configuration management with TOML support
//! - `logging`: tracing subscriber setup
//! - `error`: Step error taxonomy
//! - `stub`: Stub Rosco service (when `stub` feature is enabled)

pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod logging;
pub mod runner;
pub mod steps;
pub mod value;
pub mod world;

#[cfg(feature = "stub")]
pub mod stub;

// Re-export commonly used types for convenience
pub use client::{ConnectResponse, RoscoClient, DEFAULT_BASE_URL};
pub use context::{ResponseBody, ScenarioContext};
pub use error::{StepError, StepResult};
pub use runner::{run_features, RunSummary};
pub use steps::{dispatch, run_script, Keyword, ScriptError, StepBinding, STEP_BINDINGS};
pub use world::EcuWorld;

#[cfg(feature = "stub")]
pub use stub::{EcuStatus, StubOptions, StubServer};

// Re-export config types
pub use config::{Config, ConfigError, ConfigLoader, ConfigResult};
