// ABOUTME: Meal plan and recipe routes for the session user
// ABOUTME: Generation runs the pipeline stages in-request; reads return a flattened plan view
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use super::session::SessionContext;
use crate::constants::plan_keys::{
    CALORIES_PERCENTAGE, DISH_NAME, HIGHLIGHTS, IMAGE_REF, MEAL_NAME, PROTEIN_PERCENTAGE, RECIPE,
};
use crate::errors::{AppError, AppResult};
use crate::models::{ImageRef, MealPlan, Recipe};
use crate::pipeline::{PipelineStage, UserRunReport};
use crate::resources::ServerResources;

/// One dish as shown to a client
#[derive(Debug, Clone, Serialize)]
pub struct MealView {
    /// Slot key in the plan
    pub slot: String,
    /// Meal name written by the planner
    pub meal_name: Option<String>,
    /// Dish name
    pub dish_name: String,
    /// Share of daily calories, as written
    pub calories_percentage: Option<Value>,
    /// Share of daily protein, as written
    pub protein_percentage: Option<Value>,
    /// Vitamin and mineral highlights
    pub highlights: Option<Value>,
    /// Public image link
    pub image_url: Option<String>,
    /// Recipe, once generated
    pub recipe: Option<Recipe>,
}

/// One plan day
#[derive(Debug, Clone, Serialize)]
pub struct DayView {
    /// Day label
    pub label: String,
    /// Planner's summary of the day
    pub summary: Option<String>,
    /// Dishes in slot order
    pub meals: Vec<MealView>,
}

/// Flattened meal plan
#[derive(Debug, Clone, Serialize)]
pub struct MealPlanView {
    /// Plan id
    pub id: Uuid,
    /// Report the plan was built from
    pub nutrition_report_id: Uuid,
    /// When the plan content was generated
    pub generated_at: DateTime<Utc>,
    /// When images or recipes were last attached
    pub updated_at: DateTime<Utc>,
    /// Days in plan order
    pub days: Vec<DayView>,
}

impl From<&MealPlan> for MealPlanView {
    fn from(plan: &MealPlan) -> Self {
        let days = plan
            .day_labels()
            .into_iter()
            .map(|label| {
                let meals = plan
                    .meals_for_day(&label)
                    .into_iter()
                    .map(|(slot, entry)| {
                        let text = |key: &str| entry.get(key).and_then(Value::as_str).map(str::to_owned);
                        MealView {
                            slot: slot.to_owned(),
                            meal_name: text(MEAL_NAME),
                            dish_name: text(DISH_NAME).unwrap_or_default(),
                            calories_percentage: entry.get(CALORIES_PERCENTAGE).cloned(),
                            protein_percentage: entry.get(PROTEIN_PERCENTAGE).cloned(),
                            highlights: entry.get(HIGHLIGHTS).cloned(),
                            image_url: entry
                                .get(IMAGE_REF)
                                .and_then(|v| serde_json::from_value::<ImageRef>(v.clone()).ok())
                                .and_then(|image| image.url),
                            recipe: entry.get(RECIPE).and_then(Recipe::from_value),
                        }
                    })
                    .collect();
                DayView {
                    summary: plan.day_summary(&label).map(str::to_owned),
                    label,
                    meals,
                }
            })
            .collect();

        Self {
            id: plan.id,
            nutrition_report_id: plan.nutrition_report_id,
            generated_at: plan.generated_at,
            updated_at: plan.updated_at,
            days,
        }
    }
}

/// Result of a generation request
#[derive(Debug, Serialize)]
pub struct GenerationResponse {
    /// Stage outcomes for the user
    pub run: UserRunReport,
    /// The plan after the run
    pub meal_plan: Option<MealPlanView>,
}

/// Meal plan routes implementation
pub struct MealPlanRoutes;

impl MealPlanRoutes {
    /// Create all meal plan routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route(
                "/api/me/meal-plan",
                get(Self::handle_get_plan).post(Self::handle_generate_plan),
            )
            .route("/api/me/recipes", post(Self::handle_generate_recipes))
            .with_state(resources)
    }

    async fn run_and_load(
        resources: &ServerResources,
        user_id: Uuid,
        stages: &[PipelineStage],
    ) -> AppResult<GenerationResponse> {
        let run = resources.pipeline.run_for_user(user_id, stages).await;
        let meal_plan = resources
            .database
            .get_meal_plan_by_user(user_id)
            .await?
            .as_ref()
            .map(MealPlanView::from);
        Ok(GenerationResponse { run, meal_plan })
    }

    async fn handle_generate_plan(
        State(resources): State<Arc<ServerResources>>,
        session: SessionContext,
    ) -> AppResult<Json<GenerationResponse>> {
        let response = Self::run_and_load(
            &resources,
            session.user.id,
            &[PipelineStage::MealPlan, PipelineStage::Images],
        )
        .await?;
        Ok(Json(response))
    }

    async fn handle_generate_recipes(
        State(resources): State<Arc<ServerResources>>,
        session: SessionContext,
    ) -> AppResult<Json<GenerationResponse>> {
        let response =
            Self::run_and_load(&resources, session.user.id, &[PipelineStage::Recipes]).await?;
        Ok(Json(response))
    }

    async fn handle_get_plan(
        State(resources): State<Arc<ServerResources>>,
        session: SessionContext,
    ) -> AppResult<Json<MealPlanView>> {
        let plan = resources
            .database
            .get_meal_plan_by_user(session.user.id)
            .await?
            .ok_or_else(|| AppError::not_found("Meal plan").with_request_id(session.request_id))?;
        Ok(Json(MealPlanView::from(&plan)))
    }
}
