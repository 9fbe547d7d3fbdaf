//! Application configuration management.
//!
//! Settings are layered with figment, lowest priority first:
//! built-in defaults, the TOML config file, `DEDUP_*` environment variables,
//! and finally command-line flags (see [`Config::apply_cli`]).

use directories::ProjectDirs;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::archive::rar::DEFAULT_RAR_PROGRAM;
use crate::archive::{CleanupPolicy, ScratchSpace};
use crate::cli::Cli;
use crate::dedup::{DedupConfig, Strategy};
use crate::duplicates::{DifferConfig, HashConfig, COMPARE_CHUNK_SIZE};
use crate::scanner::HASH_CHUNK_SIZE;

/// Prefix for environment variable overrides.
pub const ENV_PREFIX: &str = "DEDUP_";

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An explicitly requested config file does not exist.
    #[error("config file not found: {0}")]
    NotFound(PathBuf),

    /// A provider produced invalid or mistyped values.
    #[error("invalid configuration: {0}")]
    Invalid(#[source] Box<figment::Error>),

    /// A value parsed but is out of range.
    #[error("invalid value for '{key}': {reason}")]
    OutOfRange {
        key: &'static str,
        reason: &'static str,
    },
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Invalid(Box::new(err))
    }
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Duplicate detection strategy.
    pub strategy: Strategy,
    /// Abort on the first unreadable file.
    pub fail_fast: bool,
    /// Read buffer size for byte comparison.
    pub compare_chunk_size: usize,
    /// Read buffer size for hashing.
    pub hash_chunk_size: usize,
    /// Extraction root; `<system temp>/dedup` when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temp_root: Option<PathBuf>,
    /// Leave extracted trees in place.
    pub keep_temp: bool,
    /// rar executable.
    pub rar_program: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            fail_fast: false,
            compare_chunk_size: COMPARE_CHUNK_SIZE,
            hash_chunk_size: HASH_CHUNK_SIZE,
            temp_root: None,
            keep_temp: false,
            rar_program: DEFAULT_RAR_PROGRAM.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from `explicit` if given, otherwise from the
    /// platform config file if it exists, then apply environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotFound`] if `explicit` does not exist, and
    /// [`ConfigError::Invalid`] or [`ConfigError::OutOfRange`] for bad values.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(path) if !path.is_file() => return Err(ConfigError::NotFound(path.into())),
            Some(path) => Some(path.to_path_buf()),
            None => Self::config_path().filter(|p| p.is_file()),
        };
        match &path {
            Some(p) => log::debug!("Loading configuration from {}", p.display()),
            None => log::debug!("No configuration file, using defaults"),
        }
        Self::load_from(Self::figment(path.as_deref()))
    }

    /// Build the layered figment: defaults, then `file`, then environment.
    #[must_use]
    pub fn figment(file: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(file) = file {
            figment = figment.merge(Toml::file(file));
        }
        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    /// Extract and validate a configuration from `figment`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if extraction or validation fails.
    pub fn load_from(figment: Figment) -> Result<Self, ConfigError> {
        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::OutOfRange`] for a zero chunk size.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.compare_chunk_size == 0 {
            return Err(ConfigError::OutOfRange {
                key: "compare_chunk_size",
                reason: "must be at least 1 byte",
            });
        }
        if self.hash_chunk_size == 0 {
            return Err(ConfigError::OutOfRange {
                key: "hash_chunk_size",
                reason: "must be at least 1 byte",
            });
        }
        Ok(())
    }

    /// Apply command-line overrides. Flags only ever switch options on.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(strategy) = cli.strategy {
            self.strategy = strategy;
        }
        if let Some(chunk_size) = cli.chunk_size {
            self.compare_chunk_size = chunk_size;
            self.hash_chunk_size = chunk_size;
        }
        if let Some(root) = &cli.temp_dir {
            self.temp_root = Some(root.clone());
        }
        if let Some(program) = &cli.rar_program {
            self.rar_program.clone_from(program);
        }
        self.fail_fast |= cli.fail_fast;
        self.keep_temp |= cli.keep_temp;
    }

    /// Cleanup policy implied by `keep_temp`.
    #[must_use]
    pub fn cleanup(&self) -> CleanupPolicy {
        if self.keep_temp {
            CleanupPolicy::Keep
        } else {
            CleanupPolicy::Remove
        }
    }

    /// Settings for a [`crate::dedup::Deduplicator`] run.
    #[must_use]
    pub fn to_dedup_config(&self, dry_run: bool) -> DedupConfig {
        DedupConfig {
            strategy: self.strategy,
            differ: DifferConfig::default()
                .with_chunk_size(self.compare_chunk_size)
                .with_fail_fast(self.fail_fast),
            hashing: HashConfig::default()
                .with_chunk_size(self.hash_chunk_size)
                .with_fail_fast(self.fail_fast),
            scratch_root: self
                .temp_root
                .clone()
                .unwrap_or_else(ScratchSpace::default_root),
            cleanup: self.cleanup(),
            dry_run,
        }
    }

    /// Get the default platform-specific configuration path.
    #[must_use]
    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "archive-dedup", "archive-dedup")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }
}
