// ABOUTME: Stateless nutrition calculator endpoint
// ABOUTME: Computes daily targets from raw biometrics without storing anything
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use axum::{routing::post, Json, Router};

use crate::config::NutritionConfig;
use crate::constants::profile::{
    MAX_AGE, MAX_HEIGHT_CM, MAX_WEIGHT_KG, MIN_AGE, MIN_HEIGHT_CM, MIN_WEIGHT_KG,
};
use crate::errors::{AppError, AppResult};
use crate::intelligence::{calculate_nutrition, NutritionInputs};
use crate::models::NutritionTargets;

/// Reject biometrics outside the accepted profile ranges
fn validate_inputs(inputs: &NutritionInputs) -> AppResult<()> {
    if !(MIN_AGE..=MAX_AGE).contains(&inputs.age) {
        return Err(AppError::invalid_input(format!(
            "age must be between {MIN_AGE} and {MAX_AGE}"
        )));
    }
    if !inputs.weight_kg.is_finite() || !(MIN_WEIGHT_KG..=MAX_WEIGHT_KG).contains(&inputs.weight_kg) {
        return Err(AppError::invalid_input(format!(
            "weight_kg must be between {MIN_WEIGHT_KG} and {MAX_WEIGHT_KG}"
        )));
    }
    if !inputs.height_cm.is_finite() || !(MIN_HEIGHT_CM..=MAX_HEIGHT_CM).contains(&inputs.height_cm) {
        return Err(AppError::invalid_input(format!(
            "height_cm must be between {MIN_HEIGHT_CM} and {MAX_HEIGHT_CM}"
        )));
    }
    Ok(())
}

/// Calculator routes implementation
pub struct CalculatorRoutes;

impl CalculatorRoutes {
    /// Create the calculator route
    pub fn routes() -> Router {
        Router::new().route("/api/calculator", post(Self::handle_calculate))
    }

    async fn handle_calculate(
        Json(inputs): Json<NutritionInputs>,
    ) -> AppResult<Json<NutritionTargets>> {
        validate_inputs(&inputs)?;
        Ok(Json(calculate_nutrition(&inputs, NutritionConfig::global())))
    }
}
