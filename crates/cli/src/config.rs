//! Configuration management for the CLI
//!
//! Settings are layered: `~/.config/kres/config.json` (optional), then
//! `KRES_*` environment variables. Command-line flags override both.

use crate::output::OutputFormat;
use anyhow::{anyhow, Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// CLI configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Settings {
    /// Kube-config context to use
    pub context: Option<String>,
    /// Kube-config file path
    pub kubeconfig: Option<String>,
    /// Default node label selector
    pub label_selector: Option<String>,
    /// Default output format (`table` or `json`)
    pub format: Option<String>,
}

impl Settings {
    /// Load configuration from the default file and environment
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from a specific file and environment
    pub fn load_from(path: &Path) -> Result<Self> {
        let settings = ::config::Config::builder()
            .add_source(
                ::config::File::from(path)
                    .format(::config::FileFormat::Json)
                    .required(false),
            )
            .add_source(::config::Environment::with_prefix("KRES"))
            .build()
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        settings
            .try_deserialize()
            .context("Failed to parse config file")
    }

    /// Configured output format, `table` when unset
    pub fn output_format(&self) -> Result<OutputFormat> {
        match self.format.as_deref() {
            Some(format) => OutputFormat::from_str(format, true)
                .map_err(|_| anyhow!("Invalid output format {:?} in configuration", format)),
            None => Ok(OutputFormat::default()),
        }
    }

    /// Get the configuration file path
    fn config_path() -> Result<PathBuf> {
        let home = dirs_next::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".config").join("kres").join("config.json"))
    }
}

/// Get kubeconfig path
///
/// An explicit path wins, then the first entry of `$KUBECONFIG`, then
/// `~/.kube/config`.
pub fn kubeconfig_path(override_path: Option<&str>) -> Result<PathBuf> {
    if let Some(path) = override_path {
        return Ok(PathBuf::from(path));
    }

    if let Some(paths) = std::env::var_os("KUBECONFIG") {
        if let Some(first) = std::env::split_paths(&paths).find(|p| !p.as_os_str().is_empty()) {
            return Ok(first);
        }
    }

    let home = dirs_next::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".kube").join("config"))
}
