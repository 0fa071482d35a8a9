//! Bridge configuration management for `tilebridge.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # Configuration section definitions
//! │   ├── resources  # [resources]
//! │   ├── serve      # [serve]
//! │   └── sync       # [sync]
//! ├── error.rs       # ConfigError
//! ├── util.rs        # Config file discovery
//! └── mod.rs         # BridgeConfig (this file)
//! ```
//!
//! The file is optional: every section has defaults, and CLI flags override
//! file values.

mod error;
pub mod section;
mod util;

pub use error::ConfigError;
pub use section::{ResourcesConfig, ServeConfig, SyncConfig};

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use util::find_config_file;

use crate::cli::{Cli, Commands};
use crate::host::SyncOptions;
use crate::log;

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing tilebridge.toml
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Absolute path to the config file, empty when none was found
    #[serde(skip)]
    pub config_path: PathBuf,

    /// WebSocket listener settings
    #[serde(default)]
    pub serve: ServeConfig,

    /// Write-back settings
    #[serde(default)]
    pub sync: SyncConfig,

    /// `loadImage` encoding settings
    #[serde(default)]
    pub resources: ResourcesConfig,
}

impl BridgeConfig {
    /// Load configuration for a CLI invocation.
    ///
    /// Searches upward from the document's directory for the config file.
    pub fn load(cli: &Cli) -> Result<Self> {
        let document_dir = cli
            .command
            .document()
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf);
        let start = match document_dir {
            Some(dir) => dir,
            None => std::env::current_dir().context("Failed to get current working directory")?,
        };

        let mut config = match find_config_file(&start, &cli.config) {
            Some(path) => {
                let mut config = Self::from_path(&path)?;
                config.config_path = path;
                config
            }
            None => {
                crate::debug!("config"; "no {} found, using defaults", cli.config.display());
                Self::default()
            }
        };

        config.apply_command_options(&cli.command);
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;
        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }

        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    /// Print warning about unknown fields.
    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        log!("warning"; "unknown fields in {}, ignoring:", path.display());
        for field in fields {
            eprintln!("- {}", field);
        }
    }

    // ========================================================================
    // cli configuration updates
    // ========================================================================

    /// Apply command-specific overrides.
    fn apply_command_options(&mut self, command: &Commands) {
        match command {
            Commands::Serve {
                interface, port, ..
            } => {
                Self::update_option(&mut self.serve.interface, interface.as_ref());
                Self::update_option(&mut self.serve.port, port.as_ref());
            }
            Commands::Render { .. } => {}
        }
    }

    /// Update config option if CLI value is provided.
    fn update_option<T: Clone>(target: &mut T, value: Option<&T>) {
        if let Some(v) = value {
            *target = v.clone();
        }
    }

    /// Check values that parse but cannot work.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sync.indent > section::MAX_INDENT {
            return Err(ConfigError::Validation(format!(
                "[sync] indent = {} exceeds the maximum of {}",
                self.sync.indent,
                section::MAX_INDENT
            )));
        }

        let mime = self.resources.fallback_mime.as_str();
        let well_formed = mime
            .split_once('/')
            .is_some_and(|(kind, sub)| !kind.is_empty() && !sub.is_empty());
        if !well_formed {
            return Err(ConfigError::Validation(format!(
                "[resources] fallback_mime = \"{mime}\" is not a MIME type"
            )));
        }

        Ok(())
    }

    /// Bridge options derived from `[sync]` and `[resources]`.
    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            indent: self.sync.indent,
            fallback_mime: self.resources.fallback_mime.clone(),
        }
    }
}

/// Parse config, panicking if there are unknown fields (to catch typos in tests).
#[cfg(test)]
pub fn test_parse_config(content: &str) -> BridgeConfig {
    let (parsed, ignored) = BridgeConfig::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

// ============================================================================
// tests
// ============================================================================
