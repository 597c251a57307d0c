//! Ledger configuration.
//!
//! [`LedgerConfig`] has defaults for every field. [`LedgerConfig::load`]
//! layers, lowest priority first: the defaults, an optional config file
//! (format picked from the extension, usually TOML), and `TALLY_*`
//! environment variables (`TALLY_SUPPLY_BASIS=rolling`, `TALLY_LOG_LEVEL=debug`).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tally_core::constants::{DEFAULT_STATE_FILE, ENV_PREFIX};
use tally_core::error::TallyError;
use tally_demurrage::SupplyBasis;

/// Configuration for a credit network instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// How the nominal supply is chosen for each demurrage event.
    pub supply_basis: SupplyBasis,
    /// Root directory for persisted state.
    pub data_dir: PathBuf,
    /// State file name inside `data_dir`.
    pub state_file: String,
    /// Log level filter string (e.g. "info", "debug", "tally_ledger=trace").
    pub log_level: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tally");

        Self {
            supply_basis: SupplyBasis::default(),
            data_dir,
            state_file: DEFAULT_STATE_FILE.to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl LedgerConfig {
    /// Load configuration from defaults, an optional file and the environment.
    ///
    /// # Errors
    ///
    /// - [`TallyError::Config`] if the file is missing or a value is malformed
    pub fn load(path: Option<&Path>) -> Result<Self, TallyError> {
        let defaults = ::config::Config::try_from(&Self::default()).map_err(config_err)?;
        let mut builder = ::config::Config::builder().add_source(defaults);
        if let Some(path) = path {
            builder = builder.add_source(::config::File::from(path).required(true));
        }
        builder
            .add_source(::config::Environment::with_prefix(ENV_PREFIX))
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(config_err)
    }

    /// Path of the persisted state file.
    pub fn state_path(&self) -> PathBuf {
        self.data_dir.join(&self.state_file)
    }
}

fn config_err(e: ::config::ConfigError) -> TallyError {
    TallyError::Config(e.to_string())
}
