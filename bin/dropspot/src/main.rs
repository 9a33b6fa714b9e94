//! `dropspot` — the DropSpot CLI client.
//!
//! Manages contexts, authentication, and drop administration.
//! Think of it as `kubectl` for DropSpot.

mod commands;
mod config;

use clap::{Parser, Subcommand};

/// DropSpot CLI tool.
#[derive(Parser, Debug)]
#[command(name = "dropspot", about = "DropSpot CLI client")]
struct Cli {
    /// Path to client config file (default: ~/.dropspot/config.toml).
    #[arg(long = "config", global = true)]
    config: Option<String>,

    /// Output format: table or json.
    #[arg(long = "output", short = 'o', global = true, default_value = "table")]
    output: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Manage contexts (generates server config + sets root password).
    #[command(name = "context")]
    Context {
        #[command(subcommand)]
        action: ContextAction,
    },

    /// Switch the current context.
    #[command(name = "use")]
    Use {
        #[command(subcommand)]
        what: UseWhat,
    },

    /// Login to the current context's server.
    Login {
        /// Username.
        #[arg(long)]
        user: Option<String>,
        /// Password (not recommended — use interactive prompt).
        #[arg(long)]
        password: Option<String>,
    },

    /// Logout — clear token from current context.
    Logout,

    /// Drop administration.
    Drop {
        #[command(subcommand)]
        action: DropAction,
    },

    /// Check server status.
    Status,

    /// Show version.
    Version,
}

#[derive(Subcommand, Debug)]
enum ContextAction {
    /// Create a new context.
    Create {
        /// Context name.
        name: String,
        /// Server config directory (default: /etc/dropspot).
        #[arg(long, default_value = "/etc/dropspot")]
        config_dir: String,
        /// Data directory (default: /var/lib/dropspot/<name>).
        #[arg(long)]
        data_dir: Option<String>,
        /// Root password (non-interactive, for CI/automation).
        /// If not provided, will prompt interactively.
        #[arg(long)]
        password: Option<String>,
    },
    /// List all contexts.
    List,
    /// Set properties on a context.
    Set {
        name: String,
        #[arg(long)]
        server: Option<String>,
    },
    /// Delete a context.
    Delete { name: String },
}

#[derive(Subcommand, Debug)]
enum UseWhat {
    /// Switch to a context.
    Context { name: String },
}

#[derive(Subcommand, Debug)]
enum DropAction {
    /// List all drops.
    List,
    /// Get a drop by ID.
    Get { id: String },
    /// Create a drop.
    Create {
        /// Display title.
        #[arg(long)]
        title: String,
        /// Display description.
        #[arg(long)]
        description: Option<String>,
        /// Number of claimable units.
        #[arg(long)]
        stock: u32,
        /// Claim window start (RFC 3339, e.g. 2026-09-01T10:00:00Z).
        #[arg(long)]
        start: String,
        /// Claim window end (RFC 3339).
        #[arg(long)]
        end: String,
    },
    /// Update a drop. Only provided fields change; stock is absolute.
    Update {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        stock: Option<u32>,
        /// Claim window start (RFC 3339).
        #[arg(long)]
        start: Option<String>,
        /// Claim window end (RFC 3339).
        #[arg(long)]
        end: Option<String>,
    },
    /// Delete a drop and its claims/waitlist.
    Delete {
        id: String,
        /// Skip confirmation.
        #[arg(long = "yes", short = 'y')]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .map(std::path::PathBuf::from)
        .unwrap_or_else(config::ClientConfig::default_path);
    let json_output = cli.output == "json";

    match cli.command {
        Commands::Context { action } => match action {
            ContextAction::Create {
                name,
                config_dir,
                data_dir,
                password,
            } => {
                let data_dir =
                    data_dir.unwrap_or_else(|| format!("/var/lib/dropspot/{}", name));

                let password = if let Some(p) = password {
                    // Non-interactive mode (CI/automation).
                    if p.is_empty() {
                        anyhow::bail!("Password cannot be empty.");
                    }
                    p
                } else {
                    // Interactive mode.
                    let pw = rpassword::prompt_password("Enter root password: ")?;
                    let confirm = rpassword::prompt_password("Confirm root password: ")?;
                    if pw != confirm {
                        anyhow::bail!("Passwords do not match.");
                    }
                    if pw.is_empty() {
                        anyhow::bail!("Password cannot be empty.");
                    }
                    pw
                };

                commands::context::create(&name, &config_dir, &data_dir, &password, &config_path)?;
            }
            ContextAction::List => {
                commands::context::list(&config_path)?;
            }
            ContextAction::Set { name, server } => {
                commands::context::set(&name, server.as_deref(), &config_path)?;
            }
            ContextAction::Delete { name } => {
                commands::context::delete(&name, &config_path)?;
            }
        },

        Commands::Use { what } => match what {
            UseWhat::Context { name } => {
                commands::context::use_context(&name, &config_path)?;
            }
        },

        Commands::Login { user, password } => {
            let username = user.unwrap_or_else(|| {
                eprint!("Username: ");
                let mut s = String::new();
                std::io::stdin().read_line(&mut s).unwrap_or_default();
                s.trim().to_string()
            });
            let password = password
                .unwrap_or_else(|| rpassword::prompt_password("Password: ").unwrap_or_default());
            commands::login::login(&username, &password, &config_path).await?;
        }

        Commands::Logout => {
            commands::login::logout(&config_path)?;
        }

        Commands::Drop { action } => match action {
            DropAction::List => {
                commands::drop::list(json_output, &config_path).await?;
            }
            DropAction::Get { id } => {
                commands::drop::get(&id, json_output, &config_path).await?;
            }
            DropAction::Create {
                title,
                description,
                stock,
                start,
                end,
            } => {
                commands::drop::create(
                    &title,
                    description.as_deref(),
                    stock,
                    &start,
                    &end,
                    json_output,
                    &config_path,
                )
                .await?;
            }
            DropAction::Update {
                id,
                title,
                description,
                stock,
                start,
                end,
            } => {
                commands::drop::update(
                    &id,
                    title.as_deref(),
                    description.as_deref(),
                    stock,
                    start.as_deref(),
                    end.as_deref(),
                    json_output,
                    &config_path,
                )
                .await?;
            }
            DropAction::Delete { id, yes } => {
                if !yes {
                    eprint!("Are you sure? [y/N]: ");
                    let mut s = String::new();
                    std::io::stdin().read_line(&mut s).unwrap_or_default();
                    if !s.trim().eq_ignore_ascii_case("y") {
                        println!("Cancelled.");
                        return Ok(());
                    }
                }
                commands::drop::delete(&id, &config_path).await?;
            }
        },

        Commands::Status => {
            commands::status::status(&config_path).await?;
        }

        Commands::Version => {
            println!("dropspot cli v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
