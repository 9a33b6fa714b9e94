//! Server-side configuration.
//!
//! Loaded from a TOML file; `resolve_path` turns a bare context name into
//! `/etc/dropspot/<name>.toml`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub root: RootConfig,
    pub jwt: JwtConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub accounts: AccountsSection,
}

/// Root superadmin credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootConfig {
    /// argon2id hash of the root password (set by `dropspot context create`).
    pub password_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    /// Access token lifetime in seconds.
    #[serde(default = "default_expire_secs")]
    pub expire_secs: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountsSection {
    /// Signing up with this email grants the admin flag.
    #[serde(default = "default_admin_email")]
    pub admin_email: String,
}

impl Default for AccountsSection {
    fn default() -> Self {
        Self {
            admin_email: default_admin_email(),
        }
    }
}

fn default_expire_secs() -> i64 {
    86400
}

fn default_admin_email() -> String {
    "admin@example.com".to_string()
}

impl ServerConfig {
    /// Resolve a context name or path into a config file path.
    ///
    /// Anything containing `/` or `.` is treated as a path; a bare name
    /// resolves to `/etc/dropspot/<name>.toml`.
    pub fn resolve_path(name_or_path: &str) -> PathBuf {
        if name_or_path.contains('/') || name_or_path.contains('.') {
            PathBuf::from(name_or_path)
        } else {
            PathBuf::from("/etc/dropspot").join(format!("{}.toml", name_or_path))
        }
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("cannot read {}: {}", path.display(), e))?;
        let config: ServerConfig = toml::from_str(&content)?;
        Ok(config)
    }
}
