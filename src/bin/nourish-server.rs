// ABOUTME: HTTP server binary for the Nourish meal-planning API
// ABOUTME: Serves the JSON routes and runs the meal reminder scheduler until shutdown
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! # Nourish Server Binary
//!
//! Loads configuration from the environment, opens the database, builds the
//! shared resources and serves the API. The reminder scheduler runs in the
//! same process unless disabled.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use nourish_server::{
    config::ServerConfig, database::Database, logging, notifications::NotificationScheduler,
    resources::ServerResources, routes::build_router,
};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "nourish-server")]
#[command(about = "Nourish - AI meal planning API with scheduled meal reminders")]
pub struct Args {
    /// Override HTTP port
    #[arg(long)]
    http_port: Option<u16>,

    /// Do not start the reminder scheduler
    #[arg(long)]
    no_scheduler: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = ServerConfig::from_env()?;
    if let Some(http_port) = args.http_port {
        config.http_port = http_port;
    }

    logging::init_from_env()?;
    info!("Starting Nourish server");
    info!("{}", config.summary());

    let database = Database::new(&config.database.to_connection_string()).await?;
    let config = Arc::new(config);
    let resources = Arc::new(ServerResources::from_config(database, config.clone())?);

    let scheduler = if args.no_scheduler || !config.schedule.enabled {
        info!("Reminder scheduler disabled");
        None
    } else {
        match resources.notification_schedule() {
            Ok(schedule) => Some(NotificationScheduler::spawn(
                resources.dispatcher.clone(),
                schedule,
            )),
            Err(e) => {
                warn!(error = %e, "Reminder scheduler not started");
                None
            }
        }
    };

    let addr: SocketAddr = format!("{}:{}", config.host, config.http_port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", config.host, config.http_port))?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    display_available_endpoints(&config);
    info!("Server listening on http://{addr}");

    let served = axum::serve(listener, build_router(resources))
        .with_graceful_shutdown(shutdown_signal())
        .await;

    if let Some(handle) = scheduler {
        handle.shutdown().await;
    }

    if let Err(e) = served {
        error!("Server error: {e}");
        return Err(e.into());
    }
    info!("Server stopped");
    Ok(())
}

/// Log the routes a client can call
fn display_available_endpoints(config: &ServerConfig) {
    let base = format!("http://{}:{}", config.host, config.http_port);
    info!("=== Available API Endpoints ===");
    info!("   Health:          GET  {base}/health");
    info!("   Submit Profile:  POST {base}/api/profile");
    info!("   Profile:         GET  {base}/api/me/profile");
    info!("   Nutrition:       GET  {base}/api/me/nutrition");
    info!("   Meal Plan:       GET|POST {base}/api/me/meal-plan");
    info!("   Recipes:         POST {base}/api/me/recipes");
    info!("   Shopping List:   GET|POST {base}/api/me/shopping-list");
    info!("   Dashboard:       GET  {base}/api/me/dashboard");
    info!("   Notify:          POST {base}/api/me/notify");
    info!("   Images:          GET  {base}/images/{{id}}");
    info!("   Calculator:      POST {base}/api/calculator");
    info!("=== End of Endpoint List ===");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C, shutting down gracefully");
        },
        () = terminate => {
            info!("Received SIGTERM, shutting down gracefully");
        },
    }
}
