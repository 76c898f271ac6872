//! Application settings loaded from `config.toml`.
//!
//! Every field has a default, so a missing file yields a usable configuration.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

const DEFAULT_VAT_RATE: f64 = 0.16;

const fn default_vat_rate() -> f64 {
    DEFAULT_VAT_RATE
}

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Settings {
    /// VAT rate applied to catalog and progress totals (0.16 = 16%)
    #[serde(default = "default_vat_rate")]
    pub vat_rate: f64,
    /// Overrides `DATABASE_URL` when set
    #[serde(default)]
    pub database_url: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            vat_rate: DEFAULT_VAT_RATE,
            database_url: None,
        }
    }
}

impl Settings {
    /// Database URL to connect to: the configured override, else the environment.
    #[must_use]
    pub fn database_url(&self) -> String {
        self.database_url
            .clone()
            .unwrap_or_else(super::database::get_database_url)
    }
}

/// Loads settings from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read (`Io`)
/// - The TOML syntax is invalid
/// - The VAT rate is negative or not finite
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<Settings> {
    debug!("Loading settings from {:?}", path.as_ref());
    let contents = std::fs::read_to_string(path.as_ref())?;

    parse_settings(&contents)
}

fn parse_settings(contents: &str) -> Result<Settings> {
    let settings: Settings = toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })?;

    if !settings.vat_rate.is_finite() || settings.vat_rate < 0.0 {
        return Err(Error::InvalidAmount {
            amount: settings.vat_rate,
        });
    }

    Ok(settings)
}

/// Loads settings from `path`, falling back to defaults when the file is absent.
pub fn load_settings_or_default<P: AsRef<Path>>(path: P) -> Result<Settings> {
    let path = path.as_ref();
    if path.exists() {
        load_settings(path)
    } else {
        info!("No settings file at {:?}, using default settings", path);
        Ok(Settings::default())
    }
}
