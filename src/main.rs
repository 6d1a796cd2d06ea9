use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use rand::Rng;
use rand::distributions::Alphanumeric;
use tracing::info;
use tracing_subscriber::EnvFilter;

use filehost::auth::{PasswordHasher, register};
use filehost::config::{AppConfig, ServerConfig};
use filehost::server::{AppState, create_router};
use filehost::storage;
use filehost::store::{SqliteStore, Store};

const CONFIG_HEADER: &str = "\
# filehost configuration.
#
# auth.secret signs session tokens and must stay private. It can also be
# supplied through FILEHOST_SECRET. S3 credentials may come from
# AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY instead of this file.
#
# storage.backend is \"local\" (objects under <data_dir>/objects) or \"s3\".

";

#[derive(Parser)]
#[command(name = "filehost")]
#[command(about = "A small file hosting server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Serve {
        /// TOML configuration file
        #[arg(long, short)]
        config: Option<PathBuf>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(long, short)]
        port: Option<u16>,

        /// Data directory for the database and local objects
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },

    /// User management
    User {
        #[command(subcommand)]
        command: UserCommands,
    },

    /// Write a default configuration file with a fresh secret
    InitConfig {
        #[arg(long, default_value = "filehost.toml")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand)]
enum UserCommands {
    /// Register a user directly in the database
    Add {
        #[arg(long)]
        name: String,

        #[arg(long)]
        email: String,

        /// Prompted for when omitted
        #[arg(long)]
        password: Option<String>,

        /// TOML configuration file naming the data directory
        #[arg(long, short)]
        config: Option<PathBuf>,

        /// Data directory holding the database, overriding the config
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Fail instead of prompting
        #[arg(long)]
        non_interactive: bool,
    },
}

fn open_store(server: &ServerConfig) -> anyhow::Result<SqliteStore> {
    fs::create_dir_all(&server.data_dir)
        .with_context(|| format!("failed to create {}", server.data_dir.display()))?;

    let store = SqliteStore::new(server.db_path())?;
    store.initialize()?;
    Ok(store)
}

fn run_user_add(
    name: &str,
    email: &str,
    password: Option<String>,
    config_path: Option<PathBuf>,
    data_dir: Option<PathBuf>,
    non_interactive: bool,
) -> anyhow::Result<()> {
    let mut config = AppConfig::load(config_path.as_deref())?;
    config.server.override_with(None, None, data_dir);

    let password = match password {
        Some(password) => password,
        None if non_interactive => bail!("--password is required with --non-interactive"),
        None => inquire::Password::new("Password:")
            .with_validator(|input: &str| {
                if input.chars().count() < 8 {
                    Err("Password must be at least 8 characters".into())
                } else {
                    Ok(inquire::validator::Validation::Valid)
                }
            })
            .prompt()?,
    };

    let store = open_store(&config.server)?;
    let user = register(&store, &PasswordHasher::new(), name, email, &password)?;

    println!("Created user '{}' ({})", user.name, user.id);
    Ok(())
}

fn run_init_config(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        bail!(
            "{} already exists. Pass --force to overwrite it.",
            path.display()
        );
    }

    let mut config = AppConfig::default();
    config.auth.secret = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(48)
        .map(char::from)
        .collect();

    let content = format!("{CONFIG_HEADER}{}", config.to_toml()?);
    fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(0o600)) {
            tracing::warn!("Failed to set permissions on {}: {e}", path.display());
        }
    }

    println!("Wrote {}", path.display());
    Ok(())
}

async fn run_serve(
    config_path: Option<PathBuf>,
    host: Option<String>,
    port: Option<u16>,
    data_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    let mut config = AppConfig::load(config_path.as_deref())?;
    config.server.override_with(host, port, data_dir);
    config.validate()?;

    let store = open_store(&config.server)?;
    let objects = storage::from_config(&config).await?;
    info!("Using {:?} object storage", config.storage.backend);

    let state = Arc::new(AppState::new(&config, Arc::new(store), objects));
    let app = create_router(state);
    let addr = config.server.socket_addr()?;

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("filehost=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            config,
            host,
            port,
            data_dir,
        } => run_serve(config, host, port, data_dir).await?,
        Commands::User { command } => match command {
            UserCommands::Add {
                name,
                email,
                password,
                config,
                data_dir,
                non_interactive,
            } => run_user_add(&name, &email, password, config, data_dir, non_interactive)?,
        },
        Commands::InitConfig { path, force } => run_init_config(&path, force)?,
    }

    Ok(())
}
