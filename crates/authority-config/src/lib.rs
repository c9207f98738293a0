//! Configuration management for Authority
//!
//! Provides hierarchical configuration loading from multiple sources:
//! 1. CLI arguments (highest precedence)
//! 2. Environment variables (AUTHORITY_* prefix, `__` between sections)
//! 3. authority.local.toml (gitignored, local overrides)
//! 4. authority.toml (git-tracked, project config)
//! 5. ~/.config/authority/config.toml (user defaults)
//! 6. Built-in defaults (lowest precedence)

use anyhow::Result;
use authority_policy::subject::{DEFAULT_KEY_PREFIX, DEFAULT_SEPARATOR};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

mod error;
mod loader;
mod paths;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use paths::{LOCAL_CONFIG_FILE, PROJECT_CONFIG_FILE, Paths};

/// Longest token lifetime `auth.expiration_secs` may ask for (one year).
pub const MAX_EXPIRATION_SECS: u64 = 366 * 24 * 60 * 60;

/// Main Authority configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthorityConfig {
    pub policies: PoliciesConfig,
    pub subject: SubjectConfig,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
}

/// Where policy documents are loaded from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoliciesConfig {
    /// Policy files, evaluated in this order.
    pub files: Vec<PathBuf>,
    /// Directory whose `*.json` files are loaded after `files`, sorted by name.
    pub directory: Option<PathBuf>,
}

/// How subject attribute keys are interpreted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubjectConfig {
    pub key_prefix: String,
    pub separator: String,
}

impl Default for SubjectConfig {
    fn default() -> Self {
        Self {
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            separator: DEFAULT_SEPARATOR.to_string(),
        }
    }
}

/// Token signing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub issuer: String,
    /// HS256 signing secret. Token commands fail without one.
    pub secret: Option<String>,
    pub expiration_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            issuer: "authority".to_string(),
            secret: None,
            expiration_secs: 3600,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default `tracing` filter; `RUST_LOG` takes precedence.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl AuthorityConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        ConfigLoader::new().load()
    }

    /// Load configuration from specific project directory
    pub fn load_from_dir(project_dir: impl AsRef<Path>) -> Result<Self> {
        ConfigLoader::new().with_project_dir(project_dir).load()
    }

    /// Parse a single TOML file, without layering.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::ParseError {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Render as TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Resolve relative paths to absolute
    pub fn resolve_paths(&mut self, base_dir: impl AsRef<Path>) {
        let base = base_dir.as_ref();

        for file in &mut self.policies.files {
            if file.is_relative() {
                *file = base.join(&*file);
            }
        }

        if let Some(directory) = &mut self.policies.directory
            && directory.is_relative()
        {
            *directory = base.join(&*directory);
        }
    }

    /// Reject settings no component can work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.subject.separator.is_empty() {
            return Err(ConfigError::ValidationError(
                "subject.separator must not be empty".to_string(),
            ));
        }
        if self.auth.expiration_secs == 0 {
            return Err(ConfigError::ValidationError(
                "auth.expiration_secs must be greater than zero".to_string(),
            ));
        }
        if self.auth.expiration_secs > MAX_EXPIRATION_SECS {
            return Err(ConfigError::ValidationError(format!(
                "auth.expiration_secs must be at most {MAX_EXPIRATION_SECS}"
            )));
        }
        if self.auth.secret.as_deref() == Some("") {
            return Err(ConfigError::ValidationError(
                "auth.secret must not be empty when set".to_string(),
            ));
        }
        Ok(())
    }

    /// Every configured policy file in evaluation order.
    ///
    /// Explicit `files` come first, then the `*.json` files of `directory`
    /// sorted by file name.
    pub fn policy_files(&self) -> Result<Vec<PathBuf>, ConfigError> {
        let mut files = self.policies.files.clone();

        if let Some(directory) = &self.policies.directory {
            let read_error = |source| ConfigError::ReadError {
                path: directory.clone(),
                source,
            };
            let mut found = Vec::new();
            for entry in fs::read_dir(directory).map_err(read_error)? {
                let path = entry.map_err(read_error)?.path();
                if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
                    found.push(path);
                }
            }
            found.sort();
            files.extend(found);
        }

        Ok(files)
    }
}
