// src/main.rs
// Fare monitor entry point: logging, engine state, scheduler tasks, HTTP API.

use std::env;

use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use fare_monitor::api;
use fare_monitor::scheduler::{run_cash_poll_service, run_refresh_service, run_startup_refresh};
use fare_monitor::state::{DocumentPaths, EngineState};

// Initialize logging with both console and file output
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    std::fs::create_dir_all("logs")?;
    let file_appender = tracing_appender::rolling::daily("logs", "fare_monitor");

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stdout)
                .with_target(false)
                .with_level(true)
                .compact(),
        )
        .with(
            fmt::layer()
                .with_writer(file_appender)
                .with_target(true)
                .with_level(true)
                .with_ansi(false),
        )
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    init_logging()?;

    let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = env::var("PORT").unwrap_or_else(|_| "8084".to_string());

    let paths = DocumentPaths::from_env();
    let state = EngineState::initialize(paths)?;

    tokio::spawn(run_refresh_service(state.clone()));
    tokio::spawn(run_startup_refresh(state.clone()));
    tokio::spawn(run_cash_poll_service(state.clone()));

    let addr = format!("{}:{}", host, port);
    info!("🚀 Fare monitor starting on http://{}", addr);
    println!("Available endpoints:");
    println!("  GET    http://{}/health", addr);
    println!("  GET    http://{}/monitors", addr);
    println!("  POST   http://{}/monitors", addr);
    println!("  PUT    http://{}/monitors/:id", addr);
    println!("  DELETE http://{}/monitors/:id", addr);
    println!("  POST   http://{}/monitors/:id/refresh", addr);
    println!("  POST   http://{}/refresh", addr);
    println!("  GET    http://{}/alerts", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, api::router(state)).await?;
    Ok(())
}
