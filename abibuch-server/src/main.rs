//! abibuch-server - Abibuch yearbook web service
//!
//! Serves the JSON API for students (Steckbrief, ranking, quotes, comments,
//! photos) and admins (reference data, imports, moderation, exports, audit).

use std::path::PathBuf;
use std::sync::Mutex;

use abibuch_common::config::{config_file_path, RootFolderInitializer, RootFolderResolver, TomlConfig};
use abibuch_common::db::init_database;
use abibuch_common::models::Role;
use abibuch_server::api::admin::accounts::{validate_password, validate_username};
use abibuch_server::db::accounts;
use abibuch_server::{build_router, AppState};
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use sqlx::SqlitePool;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Command-line arguments for abibuch-server
#[derive(Parser, Debug)]
#[command(name = "abibuch-server")]
#[command(about = "Abibuch yearbook web service")]
#[command(version)]
struct Args {
    /// Root folder holding the database and uploaded photos
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Path to the TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on, overrides `bind_address`
    #[arg(short, long, env = "ABIBUCH_BIND")]
    bind: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create an admin account, or reset its password if it exists, then exit
    CreateAdmin {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
}

/// Install the global subscriber
///
/// `RUST_LOG` wins over the configured level.
fn init_tracing(config: &TomlConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level()));

    match &config.logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config is read before tracing exists; its own warnings are lost
    let config_path = config_file_path(args.config.as_deref());
    let config = TomlConfig::load(&config_path)
        .with_context(|| format!("Failed to load config {}", config_path.display()))?;

    init_tracing(&config)?;

    // Build identification first, before any database work
    info!(
        "Starting Abibuch server (abibuch-server) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    info!("Config file: {}", config_path.display());

    let root_folder = RootFolderResolver::new(args.root_folder.clone(), &config).resolve();
    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .context("Failed to create root folder")?;
    info!("Root folder: {}", initializer.root_folder().display());

    let db_path = initializer.database_path();
    info!("Database path: {}", db_path.display());
    let pool = match init_database(&db_path).await {
        Ok(pool) => {
            info!("✓ Database ready");
            pool
        }
        Err(e) => {
            error!("Failed to initialize database: {}", e);
            return Err(e.into());
        }
    };

    if let Some(Command::CreateAdmin { username, password }) = args.command {
        return create_admin(&pool, &username, &password).await;
    }

    let purged = accounts::purge_expired_sessions(&pool).await?;
    if purged > 0 {
        info!("Purged {} expired sessions", purged);
    }
    if accounts::count_admins(&pool).await? == 0 {
        warn!("No admin account exists; create one with `abibuch-server create-admin`");
    }
    if config.cookie_secret.as_deref().map_or(true, str::is_empty) {
        warn!("cookie_secret not set; admin aliases are lost on restart");
    }

    let bind = args.bind.unwrap_or_else(|| config.bind_address());
    let state = AppState::new(pool, config, initializer.uploads_path());
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind to {}", bind))?;
    info!("abibuch-server listening on http://{}", bind);
    info!("Health check: http://{}/health", bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Create the admin account or reset its password
async fn create_admin(pool: &SqlitePool, username: &str, password: &str) -> Result<()> {
    let username = validate_username(username)?;
    validate_password(password)?;

    match accounts::find_by_username(pool, &username).await? {
        Some(account) if account.role == Role::Admin => {
            accounts::set_password(pool, &account.guid, password).await?;
            accounts::delete_sessions_for(pool, &account.guid).await?;
            info!("Reset password of admin '{}'", username);
        }
        Some(_) => bail!("'{}' is a student account", username),
        None => {
            accounts::insert(pool, &username, password, Role::Admin, None).await?;
            info!("Created admin '{}'", username);
        }
    }

    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
