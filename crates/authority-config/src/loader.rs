//! Configuration loader with multi-source merging

use crate::{AuthorityConfig, Paths};
use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};

/// Configuration loader with builder pattern
pub struct ConfigLoader {
    project_dir: PathBuf,
    env_prefix: String,
    user_config: bool,
}

impl ConfigLoader {
    /// Create a new config loader with default project directory (current dir)
    pub fn new() -> Self {
        Self {
            project_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            env_prefix: "AUTHORITY".to_string(),
            user_config: true,
        }
    }

    /// Set the project directory
    pub fn with_project_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.project_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Set the environment variable prefix (default: "AUTHORITY")
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Skip ~/.config/authority/config.toml (for testing).
    pub fn without_user_config(mut self) -> Self {
        self.user_config = false;
        self
    }

    /// Load configuration from all sources with proper precedence
    pub fn load(self) -> Result<AuthorityConfig> {
        let mut builder = config::Config::builder();

        // 1. Start with built-in defaults
        let defaults = AuthorityConfig::default();
        builder = builder.add_source(config::Config::try_from(&defaults)?);

        // 2. User config (~/.config/authority/config.toml)
        if self.user_config
            && let Ok(user_config_file) = Paths::new().user_config_file()
            && user_config_file.exists()
        {
            builder = builder.add_source(
                config::File::from(user_config_file)
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // 3. Project config (authority.toml)
        let project_config_file = Paths::project_config_file(&self.project_dir);
        if project_config_file.exists() {
            builder = builder.add_source(
                config::File::from(project_config_file)
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // 4. Local config (authority.local.toml, gitignored)
        let local_config_file = Paths::local_config_file(&self.project_dir);
        if local_config_file.exists() {
            builder = builder.add_source(
                config::File::from(local_config_file)
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // 5. Environment variables (AUTHORITY_AUTH__EXPIRATION_SECS=600)
        builder = builder.add_source(
            config::Environment::with_prefix(&self.env_prefix)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        // Build and deserialize
        let config = builder.build().context("Failed to build configuration")?;

        let mut authority_config: AuthorityConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        // Resolve relative paths
        authority_config.resolve_paths(&self.project_dir);

        authority_config
            .validate()
            .context("Configuration failed validation")?;

        Ok(authority_config)
    }

    /// Load configuration or return defaults if not found
    pub fn load_or_default(self) -> AuthorityConfig {
        self.load().unwrap_or_default()
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn loader(project_dir: &Path) -> ConfigLoader {
        ConfigLoader::new()
            .with_project_dir(project_dir)
            .with_env_prefix("AUTHORITY_TEST_UNSET")
            .without_user_config()
    }

    #[test]
    fn test_load_defaults() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let config = loader(temp_dir.path()).load().expect("Failed to load config");

        assert_eq!(config.auth.issuer, "authority");
        assert_eq!(config.auth.expiration_secs, 3600);
        assert_eq!(config.subject.key_prefix, "user:::");
    }

    #[test]
    fn test_load_project_config() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let project_dir = temp_dir.path();

        // Write project config
        let config_content = r#"
[policies]
files = ["policies/leave.json"]

[subject]
key_prefix = "subject/"
separator = "."

[auth]
issuer = "hr-portal"
secret = "s3cret"
expiration_secs = 600
"#;
        fs::write(project_dir.join("authority.toml"), config_content)
            .expect("Failed to write config");

        let config = loader(project_dir).load().expect("Failed to load config");

        assert_eq!(config.policies.files, vec![project_dir.join("policies/leave.json")]);
        assert_eq!(config.subject.key_prefix, "subject/");
        assert_eq!(config.subject.separator, ".");
        assert_eq!(config.auth.issuer, "hr-portal");
        assert_eq!(config.auth.secret.as_deref(), Some("s3cret"));
        assert_eq!(config.auth.expiration_secs, 600);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_local_overrides() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let project_dir = temp_dir.path();

        // Write project config
        fs::write(
            project_dir.join("authority.toml"),
            r#"
[logging]
level = "info"
"#,
        )
        .expect("Failed to write project config");

        // Write local override
        fs::write(
            project_dir.join("authority.local.toml"),
            r#"
[logging]
level = "authority=debug"
"#,
        )
        .expect("Failed to write local config");

        let config = loader(project_dir).load().expect("Failed to load config");

        // Local config should override project config
        assert_eq!(config.logging.level, "authority=debug");
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let project_dir = temp_dir.path();
        fs::write(
            project_dir.join("authority.toml"),
            "[auth]\nexpiration_secs = 0\n",
        )
        .expect("Failed to write config");

        assert!(loader(project_dir).load().is_err());
        assert_eq!(loader(project_dir).load_or_default(), AuthorityConfig::default());
    }

    #[test]
    fn test_oversized_expiration_is_rejected() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let project_dir = temp_dir.path();
        fs::write(
            project_dir.join("authority.toml"),
            "[auth]\nexpiration_secs = 9223372036854775807\n",
        )
        .expect("Failed to write config");

        let err = loader(project_dir).load().unwrap_err();
        assert!(format!("{err:#}").contains("expiration_secs"));
    }

    // Environment variables are not exercised here: mutating the process
    // environment races with other tests. In actual usage:
    //
    // AUTHORITY_AUTH__SECRET=s3cret
    // AUTHORITY_AUTH__EXPIRATION_SECS=600
    // AUTHORITY_LOGGING__LEVEL=debug
    //
    // override the corresponding file values.

    #[test]
    fn test_relative_paths_resolved() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let project_dir = temp_dir.path();
        fs::write(
            project_dir.join("authority.toml"),
            "[policies]\ndirectory = \"policies.d\"\n",
        )
        .expect("Failed to write config");

        let config = loader(project_dir).load().expect("Failed to load config");

        let directory = config.policies.directory.expect("directory configured");
        assert!(directory.is_absolute());
        assert_eq!(directory, project_dir.join("policies.d"));
    }
}
