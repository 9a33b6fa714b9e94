//! Server status command.

use anyhow::Result;

use crate::config::ClientConfig;

/// Check server health and version for the current context.
pub async fn status(client_config_path: &std::path::Path) -> Result<()> {
    let config = ClientConfig::load(client_config_path)?;
    let ctx = config
        .current()
        .ok_or_else(|| anyhow::anyhow!("No current context."))?;

    if ctx.server.is_empty() {
        anyhow::bail!(
            "No server URL set for context \"{}\". Run `dropspot context set {} --server <url>`.",
            ctx.name,
            ctx.name
        );
    }

    let base = ctx.server.trim_end_matches('/');
    let client = reqwest::Client::new();

    let health: serde_json::Value = client
        .get(format!("{}/health", base))
        .send()
        .await
        .map_err(|e| anyhow::anyhow!("failed to connect to server: {}", e))?
        .json()
        .await?;

    let version: serde_json::Value = client
        .get(format!("{}/version", base))
        .send()
        .await?
        .json()
        .await?;

    println!("Context: {}", ctx.name);
    println!("Server:  {}", ctx.server);
    println!(
        "Status:  {}",
        health["status"].as_str().unwrap_or("unknown")
    );
    println!(
        "Version: {} {}",
        version["name"].as_str().unwrap_or("?"),
        version["version"].as_str().unwrap_or("?")
    );
    Ok(())
}
