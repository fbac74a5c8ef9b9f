// ABOUTME: Route module organization for the Nourish HTTP API
// ABOUTME: Per-area routers merged into one application router with tracing, request-id and CORS layers
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! Route module for the Nourish server
//!
//! Each area owns a `XRoutes::routes(resources)` constructor. Handlers are
//! thin: they resolve a [`session::SessionContext`], call into the pipeline,
//! dispatcher or database, and return JSON. Errors render through
//! `AppError: IntoResponse`.

/// Stateless nutrition calculator
pub mod calculator;
/// Chart-ready dashboard data
pub mod dashboard;
/// Health check
pub mod health;
/// Stored image serving
pub mod images;
/// Meal plan and recipe generation
pub mod meal_plan;
/// Manual reminder dispatch
pub mod notify;
/// Profile submission and nutrition report
pub mod profile;
/// Per-request user resolution
pub mod session;
/// Shopping list generation and pricing
pub mod shopping;

use std::sync::Arc;

use axum::Router;
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};

use crate::middleware::{http_trace_layer, setup_cors};
use crate::resources::ServerResources;

pub use calculator::CalculatorRoutes;
pub use dashboard::DashboardRoutes;
pub use health::HealthRoutes;
pub use images::ImageRoutes;
pub use meal_plan::MealPlanRoutes;
pub use notify::NotifyRoutes;
pub use profile::ProfileRoutes;
pub use session::SessionContext;
pub use shopping::ShoppingRoutes;

/// Largest accepted request body
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Build the application router
pub fn build_router(resources: Arc<ServerResources>) -> Router {
    let cors = setup_cors(&resources.config);

    Router::new()
        .merge(HealthRoutes::routes(resources.clone()))
        .merge(ProfileRoutes::routes(resources.clone()))
        .merge(MealPlanRoutes::routes(resources.clone()))
        .merge(ShoppingRoutes::routes(resources.clone()))
        .merge(DashboardRoutes::routes(resources.clone()))
        .merge(NotifyRoutes::routes(resources.clone()))
        .merge(ImageRoutes::routes(resources))
        .merge(CalculatorRoutes::routes())
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(http_trace_layer())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
                .layer(cors),
        )
}
