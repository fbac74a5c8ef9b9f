// ABOUTME: Serves stored dish images by id
// ABOUTME: Public route; the links are written into meal plans and reminder messages
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use http::header;
use uuid::Uuid;

use crate::errors::{AppError, AppResult};
use crate::resources::ServerResources;

/// Image routes implementation
pub struct ImageRoutes;

impl ImageRoutes {
    /// Create the image route
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/images/:id", get(Self::handle_get_image))
            .with_state(resources)
    }

    async fn handle_get_image(
        State(resources): State<Arc<ServerResources>>,
        Path(id): Path<String>,
    ) -> AppResult<Response> {
        let id = Uuid::parse_str(&id)
            .map_err(|e| AppError::invalid_input(format!("Invalid image id: {e}")))?;
        let image = resources
            .database
            .get_image(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Image {id}")))?;

        Ok((
            [
                (header::CONTENT_TYPE, image.content_type),
                (header::CACHE_CONTROL, "public, max-age=86400".to_owned()),
            ],
            image.bytes,
        )
            .into_response())
    }
}
