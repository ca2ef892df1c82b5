use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::catalog::CatalogItem;
use crate::domain::{Error, Money};

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct AppConfig {
    pub log_level: String,
    pub use_json: bool,
    pub deposit_limits: DepositLimits,
    pub notifier: NotifierConfig,
    /// Append-only journal of ledger entries and account events. Accounts
    /// are rebuilt from it on start. In memory only when unset.
    pub ledger_journal: Option<PathBuf>,
    pub catalog: Vec<CatalogItem>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            use_json: false,
            deposit_limits: DepositLimits::default(),
            notifier: NotifierConfig::default(),
            ledger_journal: None,
            catalog: Vec::new(),
        }
    }
}

/// Bounds a caller applies before asking the engine for a deposit.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct DepositLimits {
    pub min: Money,
    pub max: Money,
}

impl Default for DepositLimits {
    fn default() -> Self {
        Self {
            min: Money::from_cents(500),
            max: Money::from_cents(250_000),
        }
    }
}

impl DepositLimits {
    pub fn check(&self, amount: Money) -> Result<(), Error> {
        if amount < self.min || amount > self.max {
            return Err(Error::DepositOutOfRange {
                amount,
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct NotifierConfig {
    /// Root URL of the notification service. The in-process notifier is
    /// used when unset.
    pub base_url: Option<String>,
    pub timeout_ms: u64,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_ms: 3_000,
        }
    }
}

impl NotifierConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, Error> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, Error> {
        let config: Self = serde_yaml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse config yaml: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), Error> {
        if self.deposit_limits.min > self.deposit_limits.max {
            return Err(Error::Config(format!(
                "deposit_limits.min {} exceeds max {}",
                self.deposit_limits.min, self.deposit_limits.max
            )));
        }
        if self.notifier.timeout_ms == 0 {
            return Err(Error::Config("notifier.timeout_ms must be positive".to_string()));
        }
        Ok(())
    }
}
