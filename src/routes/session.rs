// ABOUTME: Per-request session context resolving the acting user from request headers
// ABOUTME: Replaces implicit "current user" state with an explicit axum extractor
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use http::request::Parts;
use tracing::debug;
use uuid::Uuid;

use crate::errors::{AppError, AppResult};
use crate::models::UserProfile;
use crate::notifications::normalize_phone;
use crate::resources::ServerResources;

/// Header carrying the acting user's phone number
pub const USER_PHONE_HEADER: &str = "x-user-phone";
/// Header carrying the acting user's id
pub const USER_ID_HEADER: &str = "x-user-id";
/// Header set by the request-id layer
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// The acting user and request id for one request
#[derive(Debug, Clone)]
pub struct SessionContext {
    /// Request correlation id
    pub request_id: String,
    /// The resolved user
    pub user: UserProfile,
}

fn header_value<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

async fn resolve_user(parts: &Parts, resources: &ServerResources) -> AppResult<UserProfile> {
    if let Some(raw_phone) = header_value(parts, USER_PHONE_HEADER) {
        let phone = normalize_phone(raw_phone, &resources.config.messaging.default_country_code)?;
        return resources
            .database
            .get_user_by_phone(&phone)
            .await?
            .ok_or_else(|| AppError::not_found(format!("User with phone {phone}")));
    }

    if let Some(raw_id) = header_value(parts, USER_ID_HEADER) {
        let id = Uuid::parse_str(raw_id)
            .map_err(|e| AppError::invalid_input(format!("Invalid {USER_ID_HEADER}: {e}")))?;
        return resources
            .database
            .get_user(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("User {id}")));
    }

    Err(AppError::missing_field(USER_PHONE_HEADER))
}

#[async_trait]
impl FromRequestParts<Arc<ServerResources>> for SessionContext {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<ServerResources>,
    ) -> Result<Self, Self::Rejection> {
        let request_id = header_value(parts, REQUEST_ID_HEADER)
            .map_or_else(|| Uuid::new_v4().to_string(), ToOwned::to_owned);

        let user = resolve_user(parts, state)
            .await
            .map_err(|e| e.with_request_id(request_id.clone()))?;
        debug!(request_id = %request_id, user_id = %user.id, "Session resolved");

        Ok(Self { request_id, user })
    }
}
