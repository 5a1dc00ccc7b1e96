//! `mqk` — the process entrypoint (§6, §10). `mqk run` loads the configured
//! bots from layered YAML config records, constructs the bot manager,
//! starts the HTTP control surface, and stops every bot gracefully on
//! SIGINT/SIGTERM before exiting. `mqk config-hash` is a standalone
//! diagnostic for inspecting what a set of layered config files merges to.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::http::{HeaderValue, Method};
use clap::{Parser, Subcommand};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, warn, Level};

use mqk_cli::{config::load_bot_configs, runtime::build_runner};
use mqk_daemon::{routes, state::AppState};

#[derive(Parser)]
#[command(name = "mqk")]
#[command(about = "MiniQuantDesk V4 CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bring up every bot in the config and serve the HTTP control surface.
    Run {
        /// Layered YAML config paths, merge order (base -> env -> bots...).
        #[arg(long = "config", required = true)]
        config_paths: Vec<String>,

        /// Bind address for the HTTP control surface.
        #[arg(long, default_value = "127.0.0.1:8899")]
        addr: String,

        /// Directory for per-bot hash-chained audit logs; omit to disable.
        #[arg(long)]
        audit_dir: Option<PathBuf>,

        /// Grace period given to running bots on SIGINT/SIGTERM.
        #[arg(long, default_value_t = 5)]
        stop_grace_seconds: u64,
    },

    /// Compute a layered config's canonical hash and print the merged JSON.
    ConfigHash {
        /// Paths in merge order (base -> env -> engine -> risk -> stress...).
        #[arg(required = true)]
        paths: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    if let Err(err) = dispatch(Cli::parse()).await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn dispatch(cli: Cli) -> Result<()> {
    match cli.cmd {
        Commands::ConfigHash { paths } => config_hash(paths),
        Commands::Run { config_paths, addr, audit_dir, stop_grace_seconds } => {
            run(config_paths, addr, audit_dir, Duration::from_secs(stop_grace_seconds)).await
        }
    }
}

fn config_hash(paths: Vec<String>) -> Result<()> {
    let path_refs: Vec<&str> = paths.iter().map(String::as_str).collect();
    let loaded = mqk_config::load_layered_yaml(&path_refs)?;
    println!("config_hash={}", loaded.config_hash);
    println!("{}", loaded.canonical_json);
    Ok(())
}

async fn run(
    config_paths: Vec<String>,
    addr: String,
    audit_dir: Option<PathBuf>,
    stop_grace: Duration,
) -> Result<()> {
    let path_refs: Vec<&str> = config_paths.iter().map(String::as_str).collect();
    let loaded = mqk_config::load_layered_yaml(&path_refs)?;
    info!(config_hash = %loaded.config_hash, "loaded configuration");

    if let Some(dir) = &audit_dir {
        std::env::set_var("MQK_DAEMON_AUDIT_DIR", dir);
    }
    let shared = Arc::new(AppState::new());

    let bot_configs = load_bot_configs(&loaded.config_json)?;
    for (id, cfg) in &bot_configs {
        let runner = build_runner(id, cfg, &shared.registry, audit_dir.as_deref())
            .with_context(|| format!("building bot '{id}'"))?;
        shared.bots.add(id.clone(), cfg.mode.clone(), runner);
        info!(bot = %id, strategy = %cfg.record.strategy.name, mode = %cfg.mode, "configured bot");
    }
    for (id, _) in &bot_configs {
        shared.bots.start(id);
        info!(bot = %id, "started bot");
    }

    let app = routes::build_router(Arc::clone(&shared))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_localhost_only());

    let socket_addr: SocketAddr = addr.parse().context("invalid --addr")?;
    info!("mqk serving http://{socket_addr}");
    let listener = tokio::net::TcpListener::bind(socket_addr).await?;

    tokio::select! {
        res = axum::serve(listener, app) => { res.context("server crashed")?; }
        _ = shutdown_signal() => {
            warn!(grace_seconds = stop_grace.as_secs(), "shutdown signal received, stopping bots");
        }
    }

    shared.bots.stop_all(stop_grace).await;
    info!("all bots stopped, exiting");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("install SIGTERM handler")
            .recv()
            .await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

/// CORS: allow only localhost origins, matching mqk-daemon's own policy.
fn cors_localhost_only() -> CorsLayer {
    let allowed_origins = [
        "http://localhost",
        "http://127.0.0.1",
        "http://localhost:3000",
        "http://127.0.0.1:3000",
        "http://localhost:5173",
        "http://127.0.0.1:5173",
        "http://localhost:1420",
        "http://127.0.0.1:1420",
    ];

    let origins: Vec<HeaderValue> =
        allowed_origins.iter().filter_map(|o| HeaderValue::from_str(o).ok()).collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(tower_http::cors::Any)
}
