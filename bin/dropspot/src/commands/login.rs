//! Login / logout commands.

use anyhow::Result;
use dropspot_client::{PasswordLogin, TokenSource};

use crate::config::ClientConfig;

/// Login to the current context's server and store the token.
pub async fn login(
    username: &str,
    password: &str,
    client_config_path: &std::path::Path,
) -> Result<()> {
    let mut config = ClientConfig::load(client_config_path)?;

    let ctx = config
        .current()
        .ok_or_else(|| anyhow::anyhow!("No current context. Run `dropspot use context <name>`."))?
        .clone();

    if ctx.server.is_empty() {
        anyhow::bail!(
            "No server URL set for context \"{}\". Run `dropspot context set {} --server <url>`.",
            ctx.name,
            ctx.name
        );
    }

    let source = PasswordLogin::new(&ctx.server, username, password);
    let token = source
        .token()
        .await
        .map_err(|e| anyhow::anyhow!("Login failed: {}", e))?
        .ok_or_else(|| anyhow::anyhow!("No access_token in response"))?;

    // Save token to context.
    let ctx_mut = config
        .get_mut(&ctx.name)
        .ok_or_else(|| anyhow::anyhow!("Context disappeared"))?;
    ctx_mut.token = token;
    config.save(client_config_path)?;

    println!("Logged in as {}.", username);
    println!("Token saved to context \"{}\".", ctx.name);
    Ok(())
}

/// Logout — clear token from current context.
pub fn logout(client_config_path: &std::path::Path) -> Result<()> {
    let mut config = ClientConfig::load(client_config_path)?;

    let current_name = config.current_context.clone();
    if current_name.is_empty() {
        anyhow::bail!("No current context.");
    }

    let ctx = config
        .get_mut(&current_name)
        .ok_or_else(|| anyhow::anyhow!("Current context not found."))?;

    ctx.token = String::new();
    config.save(client_config_path)?;
    println!("Logged out from context \"{}\".", current_name);
    Ok(())
}
