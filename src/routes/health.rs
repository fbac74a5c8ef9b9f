// ABOUTME: Health check route for service monitoring
// ABOUTME: Reports liveness, version and database reachability
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! Health check route for load balancers and uptime probes

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};

use crate::resources::ServerResources;

/// Health routes implementation
pub struct HealthRoutes;

impl HealthRoutes {
    /// Create the health check route
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        async fn health_handler(State(resources): State<Arc<ServerResources>>) -> Json<Value> {
            let database = match resources.database.health_check().await {
                Ok(()) => json!({ "status": "ok" }),
                Err(e) => json!({ "status": "error", "error": e.message }),
            };
            Json(json!({
                "status": "healthy",
                "service": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION"),
                "database": database,
                "timestamp": chrono::Utc::now().to_rfc3339()
            }))
        }

        Router::new()
            .route("/health", get(health_handler))
            .with_state(resources)
    }
}
