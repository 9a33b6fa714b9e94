//! Client-side context management.
//!
//! Reads/writes `~/.dropspot/config.toml`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// A single context — connection to a dropspotd instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Context {
    /// Context name (e.g. "staging").
    pub name: String,

    /// Path to the server-side config file (for local deployments).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub config_path: String,

    /// Server URL (e.g. "http://localhost:8080").
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub server: String,

    /// JWT token (set by `dropspot login`).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub token: String,
}

/// Client configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Name of the currently active context.
    #[serde(rename = "current-context", default)]
    pub current_context: String,

    /// List of configured contexts.
    #[serde(default)]
    pub contexts: Vec<Context>,
}

impl ClientConfig {
    /// Default config file path: ~/.dropspot/config.toml.
    pub fn default_path() -> PathBuf {
        dirs_path().join("config.toml")
    }

    /// Load config from disk, or return default if file doesn't exist.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: ClientConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save config to disk.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the currently active context, if any.
    pub fn current(&self) -> Option<&Context> {
        self.contexts.iter().find(|c| c.name == self.current_context)
    }

    /// Get a mutable reference to a context by name.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Context> {
        self.contexts.iter_mut().find(|c| c.name == name)
    }

    /// Add or update a context.
    pub fn upsert_context(&mut self, ctx: Context) {
        if let Some(existing) = self.get_mut(&ctx.name) {
            *existing = ctx;
        } else {
            self.contexts.push(ctx);
        }
    }

    /// Remove a context by name. Returns true if it was found.
    pub fn remove_context(&mut self, name: &str) -> bool {
        let len = self.contexts.len();
        self.contexts.retain(|c| c.name != name);
        if self.current_context == name {
            self.current_context = String::new();
        }
        self.contexts.len() < len
    }
}

/// Return the DropSpot config directory (~/.dropspot).
fn dirs_path() -> PathBuf {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".dropspot")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_context(name: &str) -> Context {
        Context {
            name: name.to_string(),
            config_path: String::new(),
            server: "http://localhost:8080".to_string(),
            token: String::new(),
        }
    }

    #[test]
    fn roundtrip_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = ClientConfig::default();
        config.upsert_context(sample_context("dev"));
        config.current_context = "dev".to_string();
        config.save(&path).unwrap();

        let loaded = ClientConfig::load(&path).unwrap();
        assert_eq!(loaded.current_context, "dev");
        assert_eq!(loaded.contexts.len(), 1);
        assert_eq!(loaded.current().unwrap().server, "http://localhost:8080");
    }

    #[test]
    fn load_missing_file_gives_default() {
        let config = ClientConfig::load(Path::new("/nonexistent/config.toml")).unwrap();
        assert!(config.contexts.is_empty());
    }

    #[test]
    fn upsert_replaces_existing() {
        let mut config = ClientConfig::default();
        config.upsert_context(sample_context("dev"));
        let mut updated = sample_context("dev");
        updated.token = "jwt".to_string();
        config.upsert_context(updated);
        assert_eq!(config.contexts.len(), 1);
        assert_eq!(config.contexts[0].token, "jwt");
    }

    #[test]
    fn remove_clears_current() {
        let mut config = ClientConfig::default();
        config.upsert_context(sample_context("dev"));
        config.current_context = "dev".to_string();
        assert!(config.remove_context("dev"));
        assert!(config.current_context.is_empty());
        assert!(!config.remove_context("dev"));
    }
}
