//! Repository configuration file support.
//!
//! This module provides utilities for reading repository configuration from
//! TOML configuration files.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use super::factory::RepositoryType;
use super::repository::RepositoryError;

/// Repository configuration from file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryConfig {
    pub repository: RepositorySettings,
}

/// Repository type settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositorySettings {
    #[serde(rename = "type")]
    pub repo_type: String,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            repository: RepositorySettings {
                repo_type: "local".to_string(),
            },
        }
    }
}

impl RepositoryConfig {
    /// Load repository configuration from a TOML file.
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    /// * `Ok(RepositoryConfig)` if successful
    /// * `Err(RepositoryError)` if file cannot be read or parsed
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, RepositoryError> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            RepositoryError::configuration(format!("Failed to read config file: {}", e))
        })?;

        let config: RepositoryConfig = toml::from_str(&content).map_err(|e| {
            RepositoryError::configuration(format!("Failed to parse config file: {}", e))
        })?;

        Ok(config)
    }

    /// Load repository configuration from the default location.
    ///
    /// Searches for `repository.toml` in the current directory, then the
    /// parent directory. Falls back to defaults when no file exists.
    pub fn from_default_locations() -> Self {
        let candidates = [
            PathBuf::from("repository.toml"),
            PathBuf::from("../repository.toml"),
        ];
        for candidate in candidates {
            if candidate.exists() {
                match Self::from_file(&candidate) {
                    Ok(config) => return config,
                    Err(e) => {
                        log::warn!("Ignoring unreadable config {}: {}", candidate.display(), e);
                    }
                }
            }
        }
        Self::default()
    }

    /// Resolve the configured repository type; unknown values fall back to
    /// the in-memory backend.
    pub fn repository_type(&self) -> RepositoryType {
        self.repository
            .repo_type
            .parse()
            .unwrap_or(RepositoryType::Local)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let config: RepositoryConfig = toml::from_str(
            r#"
            [repository]
            type = "local"
            "#,
        )
        .expect("valid config");
        assert_eq!(config.repository_type(), RepositoryType::Local);
    }

    #[test]
    fn test_unknown_type_falls_back_to_local() {
        let config: RepositoryConfig = toml::from_str(
            r#"
            [repository]
            type = "something-else"
            "#,
        )
        .expect("valid config");
        assert_eq!(config.repository_type(), RepositoryType::Local);
    }

    #[test]
    fn test_default_is_local() {
        assert_eq!(
            RepositoryConfig::default().repository_type(),
            RepositoryType::Local
        );
    }
}
