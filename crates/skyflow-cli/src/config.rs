//! CLI configuration.
//!
//! Configuration is loaded from `~/.config/skyflow/config.toml`. Every value
//! can be overridden on the command line.
//!
//! ## Example Configuration
//!
//! ```toml
//! vault_id = "f8d2a1c4"
//! vault_url = "https://acme.vault.skyflowapis.com"
//! token_env = "SKYFLOW_BEARER_TOKEN"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use skyflow_client::EnvTokenProvider;
use skyflow_common::VaultConfig;

/// Environment variable read for the bearer token when none is configured.
pub const DEFAULT_TOKEN_ENV: &str = "SKYFLOW_BEARER_TOKEN";

/// Settings read from the config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliConfig {
    /// Vault identifier
    #[serde(default)]
    pub vault_id: Option<String>,

    /// Vault base URL
    #[serde(default)]
    pub vault_url: Option<String>,

    /// Name of the environment variable holding the bearer token
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            vault_id: None,
            vault_url: None,
            token_env: default_token_env(),
        }
    }
}

fn default_token_env() -> String {
    DEFAULT_TOKEN_ENV.to_string()
}

/// Values given on the command line that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub vault_id: Option<String>,
    pub vault_url: Option<String>,
    pub token_env: Option<String>,
}

impl CliConfig {
    /// Loads the configuration.
    ///
    /// An explicitly named file must exist. A missing file at the default
    /// location yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let path = Self::config_path()?;
                if !path.exists() {
                    log::debug!("No config file at {}, using defaults", path.display());
                    return Ok(Self::default());
                }
                path
            }
        };

        Self::from_file(&path)
    }

    /// Parses the configuration file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Returns the default configuration file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the config directory cannot be determined.
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to determine config directory")?
            .join("skyflow");

        Ok(config_dir.join("config.toml"))
    }

    /// Applies command line overrides.
    #[must_use]
    pub fn merge(self, overrides: Overrides) -> Self {
        Self {
            vault_id: overrides.vault_id.or(self.vault_id),
            vault_url: overrides.vault_url.or(self.vault_url),
            token_env: overrides.token_env.unwrap_or(self.token_env),
        }
    }

    /// Vault coordinates for record operations.
    ///
    /// # Errors
    ///
    /// Returns an error naming the missing setting.
    pub fn vault(&self) -> Result<VaultConfig> {
        let Some(vault_id) = &self.vault_id else {
            bail!("vault_id is not set (use --vault-id or the config file)");
        };
        let Some(vault_url) = &self.vault_url else {
            bail!("vault_url is not set (use --vault-url or the config file)");
        };

        Ok(VaultConfig::new(vault_id.as_str(), vault_url.as_str()))
    }

    /// Token provider reading the configured environment variable.
    #[must_use]
    pub fn token_provider(&self) -> EnvTokenProvider {
        EnvTokenProvider::new(self.token_env.as_str())
    }
}
