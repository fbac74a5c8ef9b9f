// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org
// ABOUTME: Calculator command computing daily nutrition targets
// ABOUTME: Pure computation; no database or configuration needed

use nourish_server::{
    config::NutritionConfig,
    errors::AppResult,
    intelligence::{calculate_nutrition, NutritionInputs},
};

use crate::helpers::display::print_json;

/// Compute and print targets for the given biometrics
#[allow(clippy::too_many_arguments)]
pub fn run(
    age: u32,
    gender: String,
    weight_kg: f64,
    height_cm: f64,
    activity: String,
    goal: String,
    diet: String,
) -> AppResult<()> {
    let inputs = NutritionInputs {
        age,
        gender,
        weight_kg,
        height_cm,
        activity,
        goal,
        diet,
    };
    let targets = calculate_nutrition(&inputs, NutritionConfig::global());
    print_json(&targets)
}
