//! Drop administration commands.
//!
//! Backed by the registry client: writes only patch local state from
//! server-confirmed responses.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use dropspot_client::{
    ApiError, DropFields, DropRecord, DropRegistry, HttpArbitrator, NoAuth, StaticToken,
    TokenSource,
};

use crate::config::{ClientConfig, Context};

fn build_registry(ctx: &Context) -> Result<DropRegistry<HttpArbitrator>> {
    if ctx.server.is_empty() {
        anyhow::bail!(
            "No server URL set for context \"{}\". Run `dropspot context set {} --server <url>`.",
            ctx.name,
            ctx.name
        );
    }
    let source: Arc<dyn TokenSource> = if ctx.token.is_empty() {
        Arc::new(NoAuth)
    } else {
        Arc::new(StaticToken::new(ctx.token.clone()))
    };
    let api = HttpArbitrator::new(&ctx.server, source);
    Ok(DropRegistry::new(api))
}

fn current_context(client_config_path: &Path) -> Result<Context> {
    let config = ClientConfig::load(client_config_path)?;
    config
        .current()
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("No current context. Run `dropspot use context <name>`."))
}

pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    s.parse::<DateTime<Utc>>()
        .map_err(|e| anyhow::anyhow!("invalid timestamp \"{}\" (want RFC 3339): {}", s, e))
}

fn print_record(record: &DropRecord, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(record)?);
    } else {
        println!("ID:          {}", record.id);
        println!("Title:       {}", record.title);
        if !record.description.is_empty() {
            println!("Description: {}", record.description);
        }
        println!("Stock:       {}", record.stock);
        println!("Window:      {} .. {}", record.claim_window_start, record.claim_window_end);
    }
    Ok(())
}

/// List all drops.
pub async fn list(json: bool, client_config_path: &Path) -> Result<()> {
    let ctx = current_context(client_config_path)?;
    let mut registry = build_registry(&ctx)?;
    let drops = registry.refresh().await.map_err(describe)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&drops)?);
        return Ok(());
    }

    if drops.is_empty() {
        println!("No drops.");
        return Ok(());
    }

    println!("{:34} {:30} {:>6}  {:20}", "ID", "TITLE", "STOCK", "WINDOW START");
    for d in drops {
        println!(
            "{:34} {:30} {:>6}  {:20}",
            d.id,
            d.title,
            d.stock,
            d.claim_window_start.to_rfc3339()
        );
    }
    Ok(())
}

/// Get a single drop by ID.
pub async fn get(id: &str, json: bool, client_config_path: &Path) -> Result<()> {
    let ctx = current_context(client_config_path)?;
    let mut registry = build_registry(&ctx)?;
    let record = registry.fetch(id).await.map_err(describe)?;
    print_record(&record, json)
}

/// Create a drop.
#[allow(clippy::too_many_arguments)]
pub async fn create(
    title: &str,
    description: Option<&str>,
    stock: u32,
    start: &str,
    end: &str,
    json: bool,
    client_config_path: &Path,
) -> Result<()> {
    let ctx = current_context(client_config_path)?;
    let mut registry = build_registry(&ctx)?;

    let fields = DropFields {
        title: Some(title.to_string()),
        description: description.map(str::to_string),
        stock: Some(stock),
        claim_window_start: Some(parse_timestamp(start)?),
        claim_window_end: Some(parse_timestamp(end)?),
    };
    let record = registry.create(fields).await.map_err(describe)?;
    print_record(&record, json)
}

/// Update a drop. Only the provided fields change.
#[allow(clippy::too_many_arguments)]
pub async fn update(
    id: &str,
    title: Option<&str>,
    description: Option<&str>,
    stock: Option<u32>,
    start: Option<&str>,
    end: Option<&str>,
    json: bool,
    client_config_path: &Path,
) -> Result<()> {
    let ctx = current_context(client_config_path)?;
    let mut registry = build_registry(&ctx)?;

    let fields = DropFields {
        title: title.map(str::to_string),
        description: description.map(str::to_string),
        stock,
        claim_window_start: start.map(parse_timestamp).transpose()?,
        claim_window_end: end.map(parse_timestamp).transpose()?,
    };
    let record = registry.update(id, fields).await.map_err(describe)?;
    print_record(&record, json)
}

/// Delete a drop. A drop already deleted elsewhere is not an error.
pub async fn delete(id: &str, client_config_path: &Path) -> Result<()> {
    let ctx = current_context(client_config_path)?;
    let mut registry = build_registry(&ctx)?;

    if registry.delete(id).await.map_err(describe)? {
        println!("Drop \"{}\" deleted.", id);
    } else {
        println!("Drop \"{}\" was already gone.", id);
    }
    Ok(())
}

fn describe(e: ApiError) -> anyhow::Error {
    match e {
        ApiError::Auth(msg) => anyhow::anyhow!("Not authorized: {}. Run `dropspot login`.", msg),
        other => anyhow::anyhow!("{}", other),
    }
}
