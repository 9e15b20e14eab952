use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::bail;
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use sheepdog::auth::issue_token;
use sheepdog::config::{FileConfig, IndexConfig, ServerConfig};
use sheepdog::index::{HttpIndexClient, IndexService, IndexVersionHelper, MemoryIndex};
use sheepdog::server::validation::validate_username;
use sheepdog::server::{AppState, create_router};
use sheepdog::store::{SqliteStore, Store};
use sheepdog::types::User;

#[cfg(unix)]
fn set_restrictive_permissions(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(0o600)) {
        tracing::warn!("Failed to set permissions on {}: {e}", path.display());
    }
}

#[derive(Parser)]
#[command(name = "sheepdog")]
#[command(about = "Project authorization and index versioning service", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Index service connection flags, layered over `sheepdog.toml`.
#[derive(Args)]
struct IndexArgs {
    /// Base URL of the index service
    #[arg(long, env = "SHEEPDOG_INDEX_URL")]
    index_url: Option<String>,

    /// Username for index writes
    #[arg(long, env = "SHEEPDOG_INDEX_USERNAME")]
    index_username: Option<String>,

    /// Password for index writes
    #[arg(long, env = "SHEEPDOG_INDEX_PASSWORD", hide_env_values = true)]
    index_password: Option<String>,
}

impl IndexArgs {
    fn resolve(self, config_path: &Path) -> anyhow::Result<IndexConfig> {
        let file = FileConfig::load(config_path)?;
        Ok(file
            .index
            .with_overrides(self.index_url, self.index_username, self.index_password))
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Administrative commands
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },

    /// Start the server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(long, short, default_value = "8080")]
        port: u16,

        /// Data directory for the database and config file
        #[arg(long, default_value = "./data")]
        data_dir: String,

        #[command(flatten)]
        index: IndexArgs,
    },

    /// Freeze the current head of each node as a new version
    Release {
        /// Release identifier stamped into each released record
        #[arg(long)]
        release_number: String,

        /// Node to release (repeatable)
        #[arg(long = "node-id", required = true)]
        node_ids: Vec<String>,

        /// Data directory holding sheepdog.toml
        #[arg(long, default_value = "./data")]
        data_dir: String,

        #[command(flatten)]
        index: IndexArgs,
    },
}

#[derive(Subcommand)]
enum AdminCommands {
    /// Initialize the server (create database and admin token)
    Init {
        /// Data directory for the database and config file
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Skip interactive prompts
        #[arg(long)]
        non_interactive: bool,
    },
}

fn run_init(data_dir: String, non_interactive: bool) -> anyhow::Result<()> {
    let config = ServerConfig {
        data_dir: data_dir.into(),
        ..ServerConfig::default()
    };
    fs::create_dir_all(&config.data_dir)?;

    let store = SqliteStore::new(config.db_path())?;
    store.initialize()?;

    let token_file = config.admin_token_path();

    if store.has_admin_token()? {
        bail!(
            "Server already initialized. Admin token exists at: {}",
            token_file.display()
        );
    }

    let (_token, raw_token) = issue_token(&store, true, None, None)?;
    fs::write(&token_file, &raw_token)?;

    #[cfg(unix)]
    set_restrictive_permissions(&token_file);

    println!();
    println!("========================================");
    println!("Admin token (save this, it won't be shown again):");
    println!();
    println!("  {raw_token}");
    println!();
    println!("Token also written to: {}", token_file.display());
    println!("========================================");
    println!();

    if !non_interactive {
        create_default_user_prompt(&store)?;
    }

    Ok(())
}

fn create_default_user_prompt(store: &SqliteStore) -> anyhow::Result<()> {
    let create_user = inquire::Confirm::new("Would you like to create a default user?")
        .with_default(false)
        .prompt()?;

    if !create_user {
        return Ok(());
    }

    let username = inquire::Text::new("Username:")
        .with_validator(|input: &str| match validate_username(input) {
            Ok(()) => Ok(inquire::validator::Validation::Valid),
            Err(message) => Ok(inquire::validator::Validation::Invalid(message.into())),
        })
        .prompt()?;

    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4().to_string(),
        username: username.clone(),
        created_at: now,
        updated_at: now,
    };
    store.create_user(&user)?;

    let (_token, raw_token) = issue_token(store, false, Some(&user.id), None)?;

    println!();
    println!("========================================");
    println!("Created user '{username}' with token:");
    println!();
    println!("  {raw_token}");
    println!();
    println!("Grant roles with POST /api/v1/admin/users/{}/roles", user.id);
    println!("========================================");
    println!();

    Ok(())
}

fn build_index(config: &IndexConfig) -> anyhow::Result<Arc<dyn IndexService>> {
    if config.url.is_none() {
        warn!("No index URL configured; using an in-memory index that is lost on restart");
        return Ok(Arc::new(MemoryIndex::new()));
    }
    let client = HttpIndexClient::new(config)?;
    info!("Using index service at {}", client.base_url());
    Ok(Arc::new(client))
}

async fn run_serve(config: ServerConfig, index: IndexArgs) -> anyhow::Result<()> {
    let token_file = config.admin_token_path();
    if !token_file.exists() {
        bail!(
            "Server not initialized. Run 'sheepdog admin init' first to create the database and admin token."
        );
    }

    let store = SqliteStore::new(config.db_path())?;
    store.initialize()?;
    if !store.has_admin_token()? {
        bail!(
            "Server not initialized. Run 'sheepdog admin init' first to create the database and admin token."
        );
    }

    info!("Admin token available at {}", token_file.display());

    let index_config = index.resolve(&config.config_path())?;
    let index = build_index(&index_config)?;

    let state = Arc::new(AppState::new(
        Arc::new(store),
        index,
        config.data_dir.clone(),
    ));

    let app = create_router(state);
    let addr = config.socket_addr()?;

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn run_release(
    release_number: String,
    node_ids: Vec<String>,
    data_dir: PathBuf,
    index: IndexArgs,
) -> anyhow::Result<()> {
    if release_number.trim().is_empty() {
        bail!("--release-number cannot be empty");
    }

    let index_config = index.resolve(&data_dir.join("sheepdog.toml"))?;
    if index_config.url.is_none() {
        bail!("An index URL is required for release (--index-url or sheepdog.toml)");
    }

    let client = HttpIndexClient::new(&index_config)?;
    let helper = IndexVersionHelper::new(Arc::new(client));

    let mut released = 0usize;
    for node_id in &node_ids {
        if helper.release_node(&release_number, node_id).await? {
            println!("released {node_id}");
            released += 1;
        } else {
            println!("skipped {node_id} (no unreleased changes)");
        }
    }

    info!(
        release = %release_number,
        released,
        total = node_ids.len(),
        "Release finished"
    );
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("sheepdog=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Admin { command } => match command {
            AdminCommands::Init {
                data_dir,
                non_interactive,
            } => {
                run_init(data_dir, non_interactive)?;
            }
        },
        Commands::Serve {
            host,
            port,
            data_dir,
            index,
        } => {
            let config = ServerConfig {
                host,
                port,
                data_dir: data_dir.into(),
            };
            run_serve(config, index).await?;
        }
        Commands::Release {
            release_number,
            node_ids,
            data_dir,
            index,
        } => {
            run_release(release_number, node_ids, data_dir.into(), index).await?;
        }
    }

    Ok(())
}
