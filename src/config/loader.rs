//! Configuration loader with file resolution and environment override support.

use super::error::{ConfigError, ConfigResult};
use super::schema::{Config, EcuBehaviour, LogFormat};
use std::path::{Path, PathBuf};

/// Environment variable prefix for overrides
const ENV_PREFIX: &str = "ROSCO_BDD";

/// Config file name
const CONFIG_FILE_NAME: &str = "rosco_bdd.toml";

/// Environment variable for explicit config path
const CONFIG_PATH_ENV: &str = "ROSCO_BDD_CONFIG";

/// Configuration loader with resolution and override logic.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Resolved config file path (if any)
    pub config_path: Option<PathBuf>,
    /// The loaded configuration
    pub config: Config,
}

impl ConfigLoader {
    /// Load configuration using standard resolution order.
    ///
    /// Resolution priority (highest to lowest):
    /// 1. `ROSCO_BDD_CONFIG` environment variable (explicit path)
    /// 2. `./rosco_bdd.toml` (current directory)
    /// 3. `<config dir>/rosco_bdd/rosco_bdd.toml`
    /// 4. Built-in defaults (no file required)
    ///
    /// Environment variables override any file values; the result is validated.
    pub fn load() -> ConfigResult<Self> {
        let config_path = resolve_config_path();

        let mut config = if let Some(ref path) = config_path {
            load_from_file(path)?
        } else {
            Config::default()
        };

        apply_env_overrides(&mut config)?;
        config.validate()?;

        Ok(Self { config_path, config })
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref().to_path_buf();
        let mut config = load_from_file(&path)?;
        apply_env_overrides(&mut config)?;
        config.validate()?;

        Ok(Self {
            config_path: Some(path),
            config,
        })
    }

    /// Load from `path` when given, otherwise use the standard resolution.
    pub fn load_with(path: Option<&Path>) -> ConfigResult<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => Self::load(),
        }
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Consume the loader and return the configuration.
    pub fn into_config(self) -> Config {
        self.config
    }
}

/// Resolve the configuration file path using standard locations.
fn resolve_config_path() -> Option<PathBuf> {
    // 1. Explicit environment variable
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. Current directory
    let cwd_config = PathBuf::from(CONFIG_FILE_NAME);
    if cwd_config.exists() {
        return Some(cwd_config);
    }

    // 3. Platform config directory (`~/.config/rosco_bdd` on Linux)
    directories::BaseDirs::new()
        .map(|dirs| dirs.config_dir().join("rosco_bdd").join(CONFIG_FILE_NAME))
        .filter(|path| path.exists())
}

/// Load configuration from a file.
fn load_from_file(path: &Path) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })
}

fn env_var(key: &str) -> Option<(String, String)> {
    let name = format!("{ENV_PREFIX}_{key}");
    std::env::var(&name).ok().map(|val| (name, val))
}

/// Apply environment variable overrides to the configuration.
///
/// Environment variables follow the pattern: `ROSCO_BDD_<SECTION>_<KEY>`
/// For example:
/// - `ROSCO_BDD_SERVICE_BASE_URL=http://localhost:9000`
/// - `ROSCO_BDD_STUB_PORT=18081`
/// - `ROSCO_BDD_LOGGING_FORMAT=json`
fn apply_env_overrides(config: &mut Config) -> ConfigResult<()> {
    if let Some((_, val)) = env_var("SERVICE_BASE_URL") {
        config.service.base_url = val;
    }

    if let Some((_, val)) = env_var("RUNNER_FEATURES") {
        config.runner.features = PathBuf::from(val);
    }

    if let Some((_, val)) = env_var("STUB_HOST") {
        config.stub.host = val;
    }
    if let Some((name, val)) = env_var("STUB_PORT") {
        config.stub.port = val
            .parse()
            .map_err(|_| ConfigError::env_parse(name, "Invalid port number"))?;
    }
    if let Some((name, val)) = env_var("STUB_BEHAVIOUR") {
        config.stub.behaviour = match val.to_lowercase().as_str() {
            "responsive" => EcuBehaviour::Responsive,
            "connect-only" => EcuBehaviour::ConnectOnly,
            "no-response" => EcuBehaviour::NoResponse,
            _ => {
                return Err(ConfigError::env_parse(
                    name,
                    "Expected responsive, connect-only or no-response",
                ))
            }
        };
    }
    if let Some((_, val)) = env_var("STUB_ECU_ID") {
        config.stub.ecu_id = val;
    }
    if let Some((name, val)) = env_var("STUB_IAC_POSITION") {
        config.stub.iac_position = val
            .parse()
            .map_err(|_| ConfigError::env_parse(name, "Invalid IAC position"))?;
    }

    if let Some((_, val)) = env_var("LOGGING_LEVEL") {
        config.logging.level = val;
    }
    if let Some((name, val)) = env_var("LOGGING_FORMAT") {
        config.logging.format = match val.to_lowercase().as_str() {
            "json" => LogFormat::Json,
            "pretty" => LogFormat::Pretty,
            "compact" => LogFormat::Compact,
            _ => return Err(ConfigError::env_parse(name, "Expected json, pretty or compact")),
        };
    }

    Ok(())
}
