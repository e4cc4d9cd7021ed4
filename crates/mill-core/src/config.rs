//! Layered configuration loading using figment.
//!
//! Sources (highest wins):
//! 1. Environment variables (`MILL_*` prefix, `__` separates sections)
//! 2. `mill.toml` in the working directory (optional)
//! 3. Built-in defaults
//!
//! `MILL_QUEUE__REQUIRED_BUILD_INTERVAL_MS=1000` -> `queue.required_build_interval_ms`.

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "mill.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    /// Figment extraction or merge error.
    #[error("Configuration error: {0}")]
    Figment(#[from] figment::Error),

    #[error("Invalid configuration value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Minimum spacing between two non-forced builds of one project.
    pub required_build_interval_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            required_build_interval_ms: 5_000,
        }
    }
}

impl QueueConfig {
    pub fn required_build_interval(&self) -> chrono::Duration {
        chrono::Duration::milliseconds(
            i64::try_from(self.required_build_interval_ms).unwrap_or(i64::MAX),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkersConfig {
    pub count: usize,
}

impl Default for WorkersConfig {
    fn default() -> Self {
        Self { count: 1 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Root of the out-of-band build logs.
    pub directory: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("build-output"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MillConfig {
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub workers: WorkersConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl MillConfig {
    /// Defaults, then `mill.toml`, then `MILL_*` env.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Like [`MillConfig::load`] with an explicit TOML file.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config: Self = Self::figment(path.as_ref()).extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("MILL_").split("__"))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers.count == 0 {
            return Err(ConfigError::InvalidValue {
                field: "workers.count".to_string(),
                reason: "at least one worker is required".to_string(),
            });
        }
        if self.output.directory.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "output.directory".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn defaults_without_sources() {
        Jail::expect_with(|_jail| {
            let config = MillConfig::load().map_err(|e| e.to_string())?;
            assert_eq!(config, MillConfig::default());
            assert_eq!(
                config.queue.required_build_interval(),
                chrono::Duration::seconds(5)
            );
            assert_eq!(config.workers.count, 1);
            assert_eq!(config.output.directory, PathBuf::from("build-output"));
            Ok(())
        });
    }

    #[test]
    fn toml_overrides_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "mill.toml",
                r#"
                [queue]
                required_build_interval_ms = 250

                [output]
                directory = "/var/lib/mill/logs"
                "#,
            )?;

            let config = MillConfig::load().map_err(|e| e.to_string())?;
            assert_eq!(config.queue.required_build_interval_ms, 250);
            assert_eq!(config.workers.count, 1);
            assert_eq!(config.output.directory, PathBuf::from("/var/lib/mill/logs"));
            Ok(())
        });
    }

    #[test]
    fn env_overrides_toml() {
        Jail::expect_with(|jail| {
            jail.create_file("mill.toml", "[workers]\ncount = 2\n")?;
            jail.set_env("MILL_WORKERS__COUNT", "4");

            let config = MillConfig::load().map_err(|e| e.to_string())?;
            assert_eq!(config.workers.count, 4);
            Ok(())
        });
    }

    #[test]
    fn zero_workers_is_invalid() {
        Jail::expect_with(|jail| {
            jail.set_env("MILL_WORKERS__COUNT", "0");

            let err = MillConfig::load().unwrap_err();
            assert!(matches!(
                err,
                ConfigError::InvalidValue { ref field, .. } if field == "workers.count"
            ));
            Ok(())
        });
    }

    #[test]
    fn malformed_value_is_a_figment_error() {
        Jail::expect_with(|jail| {
            jail.set_env("MILL_QUEUE__REQUIRED_BUILD_INTERVAL_MS", "soon");

            assert!(matches!(MillConfig::load(), Err(ConfigError::Figment(_))));
            Ok(())
        });
    }
}
