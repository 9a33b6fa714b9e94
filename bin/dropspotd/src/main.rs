//! `dropspotd` — the DropSpot server binary.
//!
//! Usage:
//!   dropspotd -c <context-name-or-path> [--listen <addr>]
//!
//! The context name resolves to `/etc/dropspot/<name>.toml`.
//! If a path with `/` or `.` is given, it's used directly.

mod auth_middleware;
mod bootstrap;
mod config;
mod routes;

use std::sync::Arc;

use clap::Parser;
use jsonwebtoken::{DecodingKey, Validation};
use tracing::info;

use dropspot_accounts::service::{AccountsConfig, AccountsService};
use dropspot_accounts::AccountsModule;
use dropspot_core::Module;
use dropspot_drops::arbiter::DropArbiter;
use dropspot_drops::store::DropStore;
use dropspot_drops::DropsModule;

use auth_middleware::JwtState;
use config::ServerConfig;
use routes::AppState;

/// DropSpot server.
#[derive(Parser, Debug)]
#[command(name = "dropspotd", about = "DropSpot server")]
struct Cli {
    /// Context name or path to config file.
    #[arg(short = 'c', long = "config", required = true)]
    config: String,

    /// Listen address (overrides default 0.0.0.0:8080).
    #[arg(long = "listen", default_value = "0.0.0.0:8080")]
    listen: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    // Load server configuration.
    let config_path = ServerConfig::resolve_path(&cli.config);
    info!("Loading configuration from {}", config_path.display());
    let server_config = ServerConfig::load(&config_path)?;

    // Verify configuration is valid.
    bootstrap::verify_config(&server_config)?;

    // Initialize storage.
    let data_dir = std::path::PathBuf::from(&server_config.storage.data_dir);
    std::fs::create_dir_all(&data_dir)?;

    let core_config = dropspot_core::ServiceConfig {
        data_dir: Some(data_dir.clone()),
        listen: cli.listen.clone(),
        ..Default::default()
    };

    let kv: Arc<dyn dropspot_kv::KVStore> = Arc::new(
        dropspot_kv::RedbStore::open(&core_config.resolve_db_path())
            .map_err(|e| anyhow::anyhow!("failed to open KV store: {}", e))?,
    );

    // ── Accounts module ──

    let accounts_config = AccountsConfig {
        jwt_secret: server_config.jwt.secret.clone(),
        access_token_ttl: server_config.jwt.expire_secs,
        admin_email: server_config.accounts.admin_email.clone(),
    };
    let accounts_service = AccountsService::new(Arc::clone(&kv), accounts_config);

    // Bootstrap: ensure the root account exists.
    bootstrap::ensure_root(&accounts_service, &server_config)?;

    let accounts_module = AccountsModule::new(accounts_service);
    info!("Accounts module initialized");

    // ── Drops module ──

    let store = Arc::new(DropStore::new(Arc::clone(&kv)));
    let arbiter = Arc::new(DropArbiter::new(store));
    let drops_module = DropsModule::new(arbiter);
    info!("Drops module initialized");

    let module_routes = vec![
        (accounts_module.name(), accounts_module.routes()),
        (drops_module.name(), drops_module.routes()),
    ];
    let admin_routes = vec![(drops_module.name(), drops_module.admin_routes())];

    // Build JWT state for middleware.
    let jwt_state = Arc::new(JwtState {
        decoding_key: DecodingKey::from_secret(server_config.jwt.secret.as_bytes()),
        validation: Validation::default(),
    });

    let app_state = AppState { jwt_state };

    let app = routes::build_router(app_state, module_routes, admin_routes);

    // Start server.
    let listener = tokio::net::TcpListener::bind(&cli.listen).await?;
    info!("DropSpot server listening on {}", cli.listen);
    axum::serve(listener, app).await?;

    Ok(())
}
