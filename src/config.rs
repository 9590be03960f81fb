//! Configuration Management
//!
//! Handles persistent configuration storage for kubeplay.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Namespace used when nothing else names one
pub const DEFAULT_NAMESPACE: &str = "default";

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    /// Kubeconfig context to use
    #[serde(default)]
    pub context: Option<String>,
    /// Last used namespace
    #[serde(default)]
    pub namespace: Option<String>,
    /// Kubeconfig file, when not the default one
    #[serde(default)]
    pub kubeconfig: Option<PathBuf>,
    /// Line editor key bindings (`emacs` or `vi`)
    #[serde(default)]
    pub edit_mode: Option<String>,
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        config_dir().map(|p| p.join("config.json"))
    }

    /// Load configuration from disk
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load from a file; a missing or unreadable file yields defaults
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring malformed config {:?}: {}", path, e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let Some(path) = Self::config_path() else {
            return Ok(());
        };
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create parent directory
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {:?}", parent))?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content).with_context(|| format!("Failed to write {:?}", path))?;

        Ok(())
    }

    /// Get effective namespace (CLI > config > kubeconfig context > "default")
    pub fn effective_namespace(&self, cli: Option<&str>, context_namespace: Option<&str>) -> String {
        cli.map(str::to_string)
            .or_else(|| self.namespace.clone())
            .or_else(|| context_namespace.map(str::to_string))
            .filter(|ns| !ns.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string())
    }

    /// Get effective context (CLI > config); `None` means the kubeconfig's current context
    pub fn effective_context(&self, cli: Option<&str>) -> Option<String> {
        cli.map(str::to_string).or_else(|| self.context.clone())
    }

    /// Get effective kubeconfig path (CLI > config)
    pub fn effective_kubeconfig(&self, cli: Option<&Path>) -> Option<PathBuf> {
        cli.map(Path::to_path_buf).or_else(|| self.kubeconfig.clone())
    }

    /// Remember the namespace for the next session
    pub fn remember_namespace(&mut self, namespace: &str) -> Result<()> {
        if self.namespace.as_deref() == Some(namespace) {
            return Ok(());
        }
        self.namespace = Some(namespace.to_string());
        self.save()
    }
}

/// `<config_dir>/kubeplay`
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("kubeplay"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespace_precedence() {
        let config = Config {
            namespace: Some("from-config".to_string()),
            ..Config::default()
        };
        assert_eq!(
            config.effective_namespace(Some("from-cli"), Some("from-context")),
            "from-cli"
        );
        assert_eq!(
            config.effective_namespace(None, Some("from-context")),
            "from-config"
        );
        assert_eq!(
            Config::default().effective_namespace(None, Some("from-context")),
            "from-context"
        );
        assert_eq!(Config::default().effective_namespace(None, None), "default");
    }

    #[test]
    fn test_context_precedence() {
        let config = Config {
            context: Some("staging".to_string()),
            ..Config::default()
        };
        assert_eq!(config.effective_context(Some("prod")).as_deref(), Some("prod"));
        assert_eq!(config.effective_context(None).as_deref(), Some("staging"));
        assert_eq!(Config::default().effective_context(None), None);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            context: Some("kind-dev".to_string()),
            namespace: Some("apps".to_string()),
            kubeconfig: None,
            edit_mode: Some("vi".to_string()),
        };

        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path), config);
    }

    #[test]
    fn test_load_tolerates_missing_and_malformed_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        assert_eq!(Config::load_from(&path), Config::default());

        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(Config::load_from(&path), Config::default());

        std::fs::write(&path, r#"{"namespace": "apps"}"#).unwrap();
        assert_eq!(Config::load_from(&path).namespace.as_deref(), Some("apps"));
    }
}
