// ABOUTME: Shopping list routes for the session user
// ABOUTME: Generation builds the list from the current plan and prices it in one request
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use super::session::SessionContext;
use crate::errors::{AppError, AppResult};
use crate::models::ShoppingList;
use crate::pipeline::{PipelineStage, UserRunReport};
use crate::resources::ServerResources;

/// Result of a shopping list generation request
#[derive(Debug, Serialize)]
pub struct ShoppingListResponse {
    /// Stage outcomes for the user
    pub run: UserRunReport,
    /// The list after the run
    pub shopping_list: Option<ShoppingList>,
}

/// Shopping list routes implementation
pub struct ShoppingRoutes;

impl ShoppingRoutes {
    /// Create all shopping list routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route(
                "/api/me/shopping-list",
                get(Self::handle_get_list).post(Self::handle_generate_list),
            )
            .with_state(resources)
    }

    async fn handle_generate_list(
        State(resources): State<Arc<ServerResources>>,
        session: SessionContext,
    ) -> AppResult<Json<ShoppingListResponse>> {
        let run = resources
            .pipeline
            .run_for_user(
                session.user.id,
                &[PipelineStage::ShoppingList, PipelineStage::Pricing],
            )
            .await;
        let shopping_list = resources
            .database
            .get_shopping_list_for_user(session.user.id)
            .await?;
        Ok(Json(ShoppingListResponse { run, shopping_list }))
    }

    async fn handle_get_list(
        State(resources): State<Arc<ServerResources>>,
        session: SessionContext,
    ) -> AppResult<Json<ShoppingList>> {
        let list = resources
            .database
            .get_shopping_list_for_user(session.user.id)
            .await?
            .ok_or_else(|| {
                AppError::not_found("Shopping list").with_request_id(session.request_id)
            })?;
        Ok(Json(list))
    }
}
