//! JSON-based configuration for gitshadow.
//!
//! The configuration names repository access descriptors (URL, SSH key
//! material, host-verification policy) and the sync pairs to run. It is
//! loaded once at startup and read-only thereafter.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::ConfigError;

// ---------------------------------------------------------------------------
// Data model
// ---------------------------------------------------------------------------

/// Access descriptor for one named repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryAccess {
    /// Name used by sync pairs to reference this repository. Unique within
    /// the configuration.
    pub repo_name: String,

    /// Transport endpoint, any URL scheme git understands.
    pub repo_url: String,

    /// Path to the PEM private key file used to authenticate.
    pub repo_pem_file_name: PathBuf,

    /// Passphrase for the key file. Empty for unencrypted keys.
    #[serde(default)]
    pub repo_pem_file_password: String,

    /// Accept any host key from the remote. An explicit trust downgrade,
    /// logged when the credential is used.
    #[serde(default)]
    pub repo_skip_host_key_validation: bool,
}

/// One source-to-destination mirroring job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncPair {
    /// Name of the repository to mirror from.
    pub source_name: String,

    /// Name of the repository to mirror to.
    pub destination_name: String,
}

/// Top-level configuration loaded from a JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Filesystem root under which shadow clones are created.
    pub shadows_location_base_path: PathBuf,

    /// Repository access descriptors, in file order.
    pub repositories: Vec<RepositoryAccess>,

    /// Sync pairs, processed sequentially in file order.
    pub sync_options: Vec<SyncPair>,
}

// ---------------------------------------------------------------------------
// Loading & validation
// ---------------------------------------------------------------------------

impl SyncConfig {
    /// Load a [`SyncConfig`] from a JSON file at the given path.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: SyncConfig =
            serde_json::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        debug!(
            repositories = config.repositories.len(),
            pairs = config.sync_options.len(),
            "configuration parsed"
        );
        Ok(config)
    }

    /// Validate that all required fields are present and sane.
    ///
    /// Referential integrity of sync pairs is deliberately not checked here;
    /// the orchestrator resolves names at use time and fails with
    /// [`ConfigError::UnknownRepository`] on a miss.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.shadows_location_base_path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "shadows_location_base_path".into(),
                detail: "shadow base path must not be empty".into(),
            });
        }
        for repo in &self.repositories {
            if repo.repo_name.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "repositories.repo_name".into(),
                    detail: "repository name must not be empty".into(),
                });
            }
            if repo.repo_url.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "repositories.repo_url".into(),
                    detail: format!("repository '{}' has an empty URL", repo.repo_name),
                });
            }
        }
        for (i, repo) in self.repositories.iter().enumerate() {
            if self.repositories[..i]
                .iter()
                .any(|r| r.repo_name == repo.repo_name)
            {
                return Err(ConfigError::InvalidValue {
                    field: "repositories.repo_name".into(),
                    detail: format!("duplicate repository name '{}'", repo.repo_name),
                });
            }
        }

        Ok(())
    }

    /// Look up a repository descriptor by name.
    pub fn repository(&self, name: &str) -> Option<&RepositoryAccess> {
        self.repositories.iter().find(|r| r.repo_name == name)
    }

    /// Convenience: load and validate in one call.
    pub fn load_and_validate<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::load_from_file(path)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sample_json() -> &'static str {
        r#"{
  "shadows_location_base_path": "/var/lib/gitshadow/shadows",
  "repositories": [
    {
      "repo_name": "upstream",
      "repo_url": "git@git.example.com:acme/widget.git",
      "repo_pem_file_name": "/etc/gitshadow/keys/upstream.pem",
      "repo_pem_file_password": "",
      "repo_skip_host_key_validation": false
    },
    {
      "repo_name": "mirror",
      "repo_url": "git@backup.example.com:acme/widget.git",
      "repo_pem_file_name": "/etc/gitshadow/keys/mirror.pem",
      "repo_pem_file_password": "hunter2",
      "repo_skip_host_key_validation": true
    }
  ],
  "sync_options": [
    { "source_name": "upstream", "destination_name": "mirror" }
  ]
}"#
    }

    #[test]
    fn test_parse_full_config() {
        let config: SyncConfig = serde_json::from_str(sample_json()).expect("parse failed");
        assert_eq!(
            config.shadows_location_base_path,
            PathBuf::from("/var/lib/gitshadow/shadows")
        );
        assert_eq!(config.repositories.len(), 2);
        assert_eq!(config.repositories[0].repo_name, "upstream");
        assert!(!config.repositories[0].repo_skip_host_key_validation);
        assert_eq!(config.repositories[1].repo_pem_file_password, "hunter2");
        assert!(config.repositories[1].repo_skip_host_key_validation);
        assert_eq!(config.sync_options.len(), 1);
        assert_eq!(config.sync_options[0].source_name, "upstream");
    }

    #[test]
    fn test_password_defaults_to_empty() {
        let json = r#"{
  "shadows_location_base_path": "/tmp/shadows",
  "repositories": [
    {
      "repo_name": "a",
      "repo_url": "git@host:a.git",
      "repo_pem_file_name": "/keys/a.pem"
    }
  ],
  "sync_options": []
}"#;
        let config: SyncConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.repositories[0].repo_pem_file_password, "");
        assert!(!config.repositories[0].repo_skip_host_key_validation);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(sample_json().as_bytes()).unwrap();

        let config = SyncConfig::load_from_file(&path).expect("load_from_file failed");
        assert_eq!(config.repositories.len(), 2);
    }

    #[test]
    fn test_file_not_found() {
        let result = SyncConfig::load_from_file("/nonexistent/config.json");
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_malformed_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        let result = SyncConfig::load_from_file(&path);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_validate_rejects_duplicate_names() {
        let mut config: SyncConfig = serde_json::from_str(sample_json()).unwrap();
        config.repositories[1].repo_name = "upstream".into();
        let result = config.validate();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "repositories.repo_name"
        ));
    }

    #[test]
    fn test_validate_rejects_empty_url() {
        let mut config: SyncConfig = serde_json::from_str(sample_json()).unwrap();
        config.repositories[0].repo_url = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_repository_lookup() {
        let config: SyncConfig = serde_json::from_str(sample_json()).unwrap();
        assert!(config.repository("upstream").is_some());
        assert!(config.repository("mirror").is_some());
        assert!(config.repository("nope").is_none());
    }
}
