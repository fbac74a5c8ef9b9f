// ABOUTME: Manual meal reminder dispatch for the session user
// ABOUTME: Accepts an optional slot index and day label; an empty body sends the whole day
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};
use tracing::info;

use super::session::SessionContext;
use crate::errors::AppResult;
use crate::notifications::{DispatchReport, DispatchTrigger};
use crate::resources::ServerResources;

/// Notification routes implementation
pub struct NotifyRoutes;

impl NotifyRoutes {
    /// Create the manual dispatch route
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/me/notify", post(Self::handle_notify))
            .with_state(resources)
    }

    async fn handle_notify(
        State(resources): State<Arc<ServerResources>>,
        session: SessionContext,
        body: Option<Json<DispatchTrigger>>,
    ) -> AppResult<Json<DispatchReport>> {
        let trigger = body.map(|Json(t)| t).unwrap_or_default();
        info!(
            request_id = %session.request_id,
            user_id = %session.user.id,
            slot_index = ?trigger.slot_index,
            day = ?trigger.day_label,
            "Manual reminder dispatch"
        );
        let report = resources
            .dispatcher
            .dispatch_for_user(session.user.id, &trigger)
            .await?;
        Ok(Json(report))
    }
}
