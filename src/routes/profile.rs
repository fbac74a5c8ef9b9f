// ABOUTME: Profile submission and nutrition report routes
// ABOUTME: Submitting a profile upserts by phone and recomputes the nutrition report
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! Profile routes
//!
//! `POST /api/profile` is the only unauthenticated write: the phone number in
//! the body identifies the user. Everything under `/api/me` resolves the user
//! through [`SessionContext`].

use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use super::session::SessionContext;
use crate::errors::{AppError, AppResult};
use crate::models::{NutritionReport, ProfileSubmission, UserProfile};
use crate::notifications::normalize_phone;
use crate::pipeline::{PipelineStage, StageOutcome};
use crate::resources::ServerResources;

/// Flattened view of a stored nutrition report
#[derive(Debug, Clone, Serialize)]
pub struct NutritionView {
    /// Report id
    pub id: Uuid,
    /// Daily calories
    pub calories: i64,
    /// Daily protein in grams
    pub protein_g: i64,
    /// Daily carbohydrates in grams
    pub carbs_g: i64,
    /// Daily fat in grams
    pub fat_g: i64,
    /// Suggested micronutrients
    pub micronutrients: Vec<String>,
    /// Per-meal targets from the report
    pub meal_targets: Value,
    /// Dietary constraints from the report
    pub constraints: Value,
    /// Calculator and agent warnings
    pub warnings: Vec<String>,
    /// Short readable summary
    pub summary: String,
    /// Full stored report
    pub report: Value,
    /// When the report was produced
    pub generated_at: DateTime<Utc>,
}

impl From<&NutritionReport> for NutritionView {
    fn from(report: &NutritionReport) -> Self {
        Self {
            id: report.id,
            calories: report.calories(),
            protein_g: report.protein_g(),
            carbs_g: report.carbs_g(),
            fat_g: report.fat_g(),
            micronutrients: report.micronutrients(),
            meal_targets: report.meal_targets(),
            constraints: report.constraints(),
            warnings: report.warnings(),
            summary: report.human_summary(),
            report: report.report.clone(),
            generated_at: report.generated_at,
        }
    }
}

/// Response to a profile submission
#[derive(Debug, Serialize)]
pub struct ProfileSubmitted {
    /// The stored profile
    pub profile: UserProfile,
    /// How the nutrition stage ended
    pub outcome: StageOutcome,
    /// The report now on file
    pub nutrition: Option<NutritionView>,
}

/// Profile routes implementation
pub struct ProfileRoutes;

impl ProfileRoutes {
    /// Create all profile routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/profile", post(Self::handle_submit))
            .route("/api/me/profile", get(Self::handle_get_profile))
            .route("/api/me/nutrition", get(Self::handle_get_nutrition))
            .with_state(resources)
    }

    async fn handle_submit(
        State(resources): State<Arc<ServerResources>>,
        Json(mut submission): Json<ProfileSubmission>,
    ) -> AppResult<Json<ProfileSubmitted>> {
        submission.validate()?;
        submission.phone = normalize_phone(
            &submission.phone,
            &resources.config.messaging.default_country_code,
        )?;

        let profile = resources.database.upsert_user_by_phone(&submission).await?;
        info!(user_id = %profile.id, "Profile saved");

        let outcome = resources
            .pipeline_context()
            .run_stage(PipelineStage::Nutrition, profile.id)
            .await?;
        let nutrition = resources
            .database
            .get_nutrition_report(profile.id)
            .await?
            .as_ref()
            .map(NutritionView::from);

        Ok(Json(ProfileSubmitted {
            profile,
            outcome,
            nutrition,
        }))
    }

    async fn handle_get_profile(session: SessionContext) -> Json<UserProfile> {
        Json(session.user)
    }

    async fn handle_get_nutrition(
        State(resources): State<Arc<ServerResources>>,
        session: SessionContext,
    ) -> AppResult<Json<NutritionView>> {
        let report = resources
            .database
            .get_nutrition_report(session.user.id)
            .await?
            .ok_or_else(|| {
                AppError::not_found("Nutrition report").with_request_id(session.request_id)
            })?;
        Ok(Json(NutritionView::from(&report)))
    }
}
