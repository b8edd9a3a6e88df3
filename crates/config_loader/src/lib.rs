//! # Config Loader
//!
//! Configuration loading and parsing module.
//!
//! Responsibilities:
//! - Parse TOML/JSON configuration files
//! - Validate configuration legality
//! - Produce `PrepareConfig` (target preparation) and `PoolProfile` (worker pool)
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let config = ConfigLoader::load_prepare(Path::new("prepare.toml")).unwrap();
//! println!("Durations: {:?}", config.durations);
//! ```

mod parser;
mod validator;

pub use contracts::{PoolProfile, PrepareConfig};
pub use parser::ConfigFormat;
pub use validator::{
    validate_durations, validate_period_range, validate_prepare, validate_profile, MIN_DURATION,
};

use contracts::ContractError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

/// Configuration loader
///
/// Provides static methods to load configuration from files or strings.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load a preparation config from file path
    ///
    /// Automatically detects format from file extension (.toml / .json).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_prepare(path: &Path) -> Result<PrepareConfig, ContractError> {
        let config: PrepareConfig = Self::load_from_path(path)?;
        validator::validate_prepare(&config)?;
        Ok(config)
    }

    /// Load a worker pool profile from file path
    ///
    /// # Errors
    /// Same as [`ConfigLoader::load_prepare`].
    pub fn load_profile(path: &Path) -> Result<PoolProfile, ContractError> {
        let profile: PoolProfile = Self::load_from_path(path)?;
        validator::validate_profile(&profile)?;
        Ok(profile)
    }

    /// Parse and validate a preparation config from string
    pub fn prepare_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<PrepareConfig, ContractError> {
        let config: PrepareConfig = parser::parse(content, format)?;
        validator::validate_prepare(&config)?;
        Ok(config)
    }

    /// Serialize a config to TOML string
    pub fn to_toml<T: Serialize>(config: &T) -> Result<String, ContractError> {
        toml::to_string_pretty(config)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize a config to JSON string
    pub fn to_json<T: Serialize>(config: &T) -> Result<String, ContractError> {
        serde_json::to_string_pretty(config)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }
}

impl ConfigLoader {
    fn load_from_path<T: DeserializeOwned>(path: &Path) -> Result<T, ContractError> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        parser::parse(&content, format)
    }

    /// Infer configuration format from file extension
    fn detect_format(path: &Path) -> Result<ConfigFormat, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }

    /// Read configuration file content
    fn read_file(path: &Path) -> Result<String, ContractError> {
        std::fs::read_to_string(path)
            .map_err(|e| ContractError::path(path, format!("cannot read config: {e}")))
    }
}
