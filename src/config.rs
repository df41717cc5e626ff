// ⚙️ Configuration - JSON file with defaults for every field

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::entities::{AccountType, Bank, DEFAULT_MIN_PIN_LENGTH};

/// Environment variable naming a config file
pub const CONFIG_ENV: &str = "BANK_ATM_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AtmConfig {
    /// Shortest PIN accepted at account creation
    pub min_pin_length: usize,

    /// Account type used before the customer selects one
    pub default_account_type: AccountType,

    /// CSV file with accounts to provision at startup
    pub accounts_file: Option<PathBuf>,

    /// Used when RUST_LOG is unset
    pub log_filter: String,
}

impl Default for AtmConfig {
    fn default() -> Self {
        AtmConfig {
            min_pin_length: DEFAULT_MIN_PIN_LENGTH,
            default_account_type: AccountType::Checking,
            accounts_file: None,
            log_filter: "info".to_string(),
        }
    }
}

impl AtmConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: AtmConfig = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Explicit path first, then `BANK_ATM_CONFIG`, then defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }
        match std::env::var_os(CONFIG_ENV) {
            Some(env_path) => Self::from_file(Path::new(&env_path)),
            None => Ok(Self::default()),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.min_pin_length == 0 {
            anyhow::bail!("min_pin_length must be at least 1");
        }
        Ok(())
    }

    pub fn build_bank(&self) -> Bank {
        Bank::with_min_pin_length(self.min_pin_length)
    }
}
