//! Robot tournament server.
//!
//! Serves the tournament engine over HTTP, backed by PostgreSQL or, with
//! `--memory`, by an in-process store.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Error};
use log::info;
use pico_args::Arguments;
use robo_tournament::{
    db::{Database, MemoryTournamentRepository, TournamentRepository},
    tournament::TournamentManager,
};
use rt_server::{
    api,
    config::ServerConfig,
    logging, metrics,
};

const HELP: &str = "\
Run the robot tournament server

USAGE:
  rt_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:6969]
  --db-url     URL         Database connection string  [default: env DATABASE_URL]

FLAGS:
  --memory                 Keep all data in memory (lost on exit)
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:8080)
  DATABASE_URL             PostgreSQL connection string
  METRICS_BIND             Prometheus scrape address (disabled when unset)
  GROUP_SIZE_DEFAULT       Seats per group [default: 5]
  GROUP_SIZE_OVERRIDES     Per-category sizes, e.g. 1:2,3:4 [default: 1:2]
  AUTO_COMPLETE_BYES       Close single-member groups immediately [default: false]
  RUST_LOG                 Log filter [default: info,sqlx=warn,hyper=warn]
";

struct Args {
    bind: Option<SocketAddr>,
    database_url: Option<String>,
    memory: bool,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = Args {
        bind: pargs
            .opt_value_from_str("--bind")
            .context("Invalid --bind address")?,
        database_url: pargs.opt_value_from_str("--db-url")?,
        memory: pargs.contains("--memory"),
    };

    logging::init();

    let config = ServerConfig::from_env(args.bind, args.database_url, args.memory)?;
    config.validate()?;

    if let Some(addr) = config.metrics_bind {
        metrics::init_metrics(addr).map_err(anyhow::Error::msg)?;
        info!("Metrics exporter listening on {}", addr);
    }

    let repo: Arc<dyn TournamentRepository> = if config.memory {
        info!("Using in-memory storage; data is lost on exit");
        Arc::new(MemoryTournamentRepository::new())
    } else {
        info!("Connecting to database");
        let db = Database::new(&config.database)
            .await
            .context("Failed to connect to database")?;
        db.ensure_schema()
            .await
            .context("Failed to prepare database schema")?;
        info!("Database connected successfully");
        Arc::new(db.repository())
    };

    info!(
        "Default group size {}, byes {}",
        config.bracket.group_sizes.default_size,
        if config.bracket.auto_complete_byes {
            "auto-complete"
        } else {
            "need a manual winner"
        }
    );

    let manager = TournamentManager::new(repo, config.bracket.clone());
    let app = api::create_router(api::AppState::new(manager));

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutting down server...");

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to install CTRL+C signal handler: {}", e);
        std::future::pending::<()>().await;
    }
}
