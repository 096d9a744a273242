//! Configuration: CLI verbosity plus the per-deployment settings file.
//!
//! Settings are read from `deploy.toml` at the repository root (or the path
//! given with `--config`). A missing default file means built-in defaults;
//! a missing explicit file is an error.

use crate::runner::{self, CommandLogger};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File looked up in the repository root when `--config` is not given.
pub const DEFAULT_SETTINGS_FILE: &str = "deploy.toml";

/// Placeholder in `exec_start` replaced with the absolute virtualenv path.
const VENV_PLACEHOLDER: &str = "{venv}";

/// Runtime configuration derived from CLI arguments.
#[derive(Debug, Clone, Copy, Default)]
pub struct Config {
    /// Controls the verbosity level of CLI output.
    pub verbosity: Verbosity,
}

impl Config {
    #[must_use]
    pub fn is_quiet(&self) -> bool {
        self.verbosity == Verbosity::Quiet
    }

    #[must_use]
    pub fn is_verbose(&self) -> bool {
        self.verbosity == Verbosity::Verbose
    }

    /// Returns the command logger matching the verbosity setting.
    #[must_use]
    pub fn command_logger(&self) -> CommandLogger {
        if self.is_verbose() {
            runner::verbose_logger
        } else {
            runner::no_op_logger
        }
    }
}

/// Verbosity level for CLI output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    Quiet,
    #[default]
    Normal,
    Verbose,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read settings file '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse settings file '{path}': {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// What to deploy and how the host runs it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeploySettings {
    /// systemd unit name, without `.service`.
    pub service: String,
    /// Earlier unit name retired during setup, if any.
    pub legacy_service: Option<String>,
    pub description: String,
    /// Relative to the repository root unless absolute.
    pub venv_dir: PathBuf,
    pub requirements: PathBuf,
    /// Script run with the virtualenv's python, no arguments.
    pub migration: PathBuf,
    /// Prefix privileged commands with `sudo`.
    pub use_sudo: bool,
    pub unit_dir: PathBuf,
    pub exec_start: String,
    /// Account the service runs as; falls back to `$SUDO_USER`, `$USER`, then `root`.
    pub user: Option<String>,
}

impl Default for DeploySettings {
    fn default() -> Self {
        Self {
            service: "foodscan".to_string(),
            legacy_service: Some("hahealth".to_string()),
            description: "FoodScan API".to_string(),
            venv_dir: PathBuf::from("venv"),
            requirements: PathBuf::from("requirements.txt"),
            migration: PathBuf::from("database.py"),
            use_sudo: true,
            unit_dir: PathBuf::from("/etc/systemd/system"),
            exec_start: "{venv}/bin/uvicorn server:app --host 0.0.0.0 --port 8000".to_string(),
            user: None,
        }
    }
}

impl DeploySettings {
    /// Loads settings for the repository at `root`.
    pub fn load(root: &Path, explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::read(path),
            None => {
                let path = root.join(DEFAULT_SETTINGS_FILE);
                if path.is_file() {
                    Self::read(&path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// The legacy unit name; an empty string in the file disables retirement.
    pub fn legacy_service(&self) -> Option<&str> {
        self.legacy_service.as_deref().filter(|name| !name.is_empty())
    }

    pub fn venv_path(&self, root: &Path) -> PathBuf {
        root.join(&self.venv_dir)
    }

    pub fn unit_path(&self, service: &str) -> PathBuf {
        self.unit_dir.join(format!("{}.service", service))
    }

    /// `exec_start` with the virtualenv placeholder expanded.
    pub fn resolved_exec_start(&self, root: &Path) -> String {
        let venv = self.venv_path(root);
        self.exec_start
            .replace(VENV_PLACEHOLDER, &venv.display().to_string())
    }

    pub fn resolved_user(&self) -> String {
        self.user
            .clone()
            .or_else(|| std::env::var("SUDO_USER").ok().filter(|u| !u.is_empty()))
            .or_else(|| std::env::var("USER").ok().filter(|u| !u.is_empty()))
            .unwrap_or_else(|| "root".to_string())
    }
}
