use std::path::PathBuf;

use cmk::{MintConfig, PublicKey};
use cmk_fake_machine::FakeMachineConfig;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

const DEFAULT_WORK_DIR: &str = ".cmk";

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    #[default]
    Fake,
}

impl std::str::FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fake" => Ok(Backend::Fake),
            _ => Err(format!("Unknown machine backend: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Wallet {
    /// Connected wallet, none when no wallet is connected
    pub identity: Option<PublicKey>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub mint: MintConfig,
    #[serde(default)]
    pub wallet: Wallet,
    #[serde(default)]
    pub backend: Backend,
    #[serde(default)]
    pub fake_machine: FakeMachineConfig,
}

impl Settings {
    /// Default config file, `~/.cmk/config.toml`
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        Ok(home::home_dir()
            .ok_or(ConfigError::NotFound("Config Path".to_string()))?
            .join(DEFAULT_WORK_DIR)
            .join("config.toml"))
    }

    /// Load settings: built in defaults, then the config file, then `CMK_*`
    /// environment variables
    pub fn new<P>(config_file_name: Option<P>) -> Result<Self, ConfigError>
    where
        P: Into<PathBuf>,
    {
        let config_file_name = match config_file_name {
            Some(value) => value.into(),
            None => Self::default_path()?,
        };

        let config: Config = Config::builder()
            // use defaults
            .set_default("mint.tx_timeout_ms", cmk::config::DEFAULT_TX_TIMEOUT_MS)?
            .set_default("mint.poll_interval_ms", cmk::config::DEFAULT_POLL_INTERVAL_MS)?
            // override with file contents
            .add_source(File::from(config_file_name).required(false))
            // override with env, e.g. CMK_MINT__CANDY_MACHINE_ID
            .add_source(
                Environment::with_prefix("CMK")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Settings = config.try_deserialize()?;

        match settings.backend {
            Backend::Fake => {
                tracing::warn!("Using the fake machine backend, nothing is sent to a cluster");
            }
        }

        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use std::env::current_dir;

    use cmk::Commitment;

    use super::*;

    #[test]
    fn example_is_parsed() {
        let settings = Settings::new(Some(format!(
            "{}/example.config.toml",
            current_dir().expect("cwd").to_string_lossy()
        )))
        .expect("example parses");

        assert_eq!(settings.backend, Backend::Fake);
        assert_eq!(settings.mint.commitment, Commitment::Confirmed);
        assert_eq!(settings.mint.tx_timeout_ms, 30_000);
        assert_eq!(settings.fake_machine.items_available, 100);
        assert!(settings.wallet.identity.is_some());
    }

    #[test]
    fn missing_file_needs_machine() {
        let err = Settings::new(Some("/nonexistent/cmk/config.toml"));
        assert!(err.is_err());
    }
}
