//! Bootstrap — first-start checks and root account creation.
//!
//! When dropspotd starts:
//! 1. Verify the config has a root password hash — if not, refuse to start.
//! 2. Ensure the root account exists in storage.

use std::sync::Arc;

use dropspot_accounts::service::AccountsService;
use tracing::info;

use crate::config::ServerConfig;

/// Verify server configuration is ready for production use.
pub fn verify_config(config: &ServerConfig) -> anyhow::Result<()> {
    if config.root.password_hash.is_empty() {
        anyhow::bail!(
            "No root password hash found in configuration.\n\
             Run `dropspot context create <name>` to set up the server first."
        );
    }
    if config.jwt.secret.is_empty() {
        anyhow::bail!("JWT secret is empty in configuration.");
    }
    if config.storage.data_dir.is_empty() {
        anyhow::bail!("Storage data_dir is empty in configuration.");
    }
    Ok(())
}

/// Ensure the root account exists. Creates it from the configured hash if
/// missing.
pub fn ensure_root(accounts: &Arc<AccountsService>, config: &ServerConfig) -> anyhow::Result<()> {
    accounts
        .ensure_root(&config.root.password_hash)
        .map_err(|e| anyhow::anyhow!("failed to ensure root account: {}", e))?;
    info!("root account verified");
    Ok(())
}
