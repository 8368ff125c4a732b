use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use persuratan::handlers::activity;
use persuratan::{db, routes, AppState, Config};

#[derive(Debug, Parser)]
#[command(name = "persuratan", version, about = "Correspondence tracking server")]
struct Args {
    /// Path to configuration file
    #[arg(
        short,
        long,
        env = "PERSURATAN_CONFIG",
        default_value = "./etc/persuratan.toml"
    )]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration first (before logging init); only a missing file
    // falls back to defaults
    let (config, found) = Config::load_or_default(&args.config.to_string_lossy())
        .map_err(|e| anyhow::anyhow!("Invalid config file {}: {}", args.config.display(), e))?;

    // Priority: RUST_LOG env var > config file > default "info"
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log.level));

    fmt::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    info!("Starting Persuratan server...");
    if found {
        info!("Loaded configuration from: {}", args.config.display());
    } else {
        tracing::warn!(
            "Config file {} not found, using defaults",
            args.config.display()
        );
    }

    let db_conn = db::init_database(&config.database).await.map_err(|e| {
        tracing::error!("Database initialization failed: {}", e);
        anyhow::anyhow!("Database initialization failed: {}", e)
    })?;

    activity::service::init(db_conn.clone());
    info!("Activity log service initialized");

    match &config.admin {
        Some(admin) => {
            if db::bootstrap_admin(&db_conn, admin).await? {
                info!("Created initial administrator {}", admin.email);
            }
        }
        None => tracing::debug!("No [admin] section, skipping bootstrap"),
    }

    tokio::fs::create_dir_all(&config.upload_dir).await?;

    let addr: SocketAddr = config.addr.parse().map_err(|e| {
        anyhow::anyhow!("Invalid address '{}': {}", config.addr, e)
    })?;

    let state = AppState::new(db_conn, config);
    let app = routes::create_router(state);

    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
