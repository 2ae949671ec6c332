mod config;
mod handlers;
pub mod service;


use axum::routing::{get, post};
use axum::Router;
use clap::Parser;
use handlers::AppState;
use report::AnalysisConfig;
use service::{CeCostQuery, DemoCostQuery};
use std::sync::Arc;

use crate::config::load_config;

#[derive(Parser)]
#[command(name = "cost-report-server")]
struct Args {
    #[arg(long, default_value = "config")]
    config_file: String,

    #[arg(long)]
    demo: bool,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(handlers::healthz))
        .route("/reports", post(handlers::create_report))
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("server=info"));

    let args = Args::parse();

    if args.demo {
        log::info!("Running in DEMO mode (synthetic cost data)");

        let state = AppState {
            service: Arc::new(DemoCostQuery),
            analysis: Arc::new(AnalysisConfig::default()),
        };

        let app = build_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
        log::info!("Listening on http://127.0.0.1:8080");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        return Ok(());
    }

    let app_config = load_config(&args.config_file).await?;
    let ce_client = ce::new_client().await;

    let state = AppState {
        service: Arc::new(CeCostQuery { client: ce_client }),
        analysis: Arc::new(app_config.analysis.clone()),
    };

    let app = build_router(state);

    let listener =
        tokio::net::TcpListener::bind(format!("{}:{}", app_config.host, app_config.port)).await?;
    log::info!(
        "Listening on http://{}:{}",
        app_config.host,
        app_config.port
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
