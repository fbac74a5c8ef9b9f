// ABOUTME: Intelligence module for deterministic nutrition analysis
// ABOUTME: Hosts the BMR/TDEE calculator used by the nutrition stage and its agent tool
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! # Intelligence Module
//!
//! Pure calculations with no I/O. The nutrition calculator backs both the
//! nutrition pipeline stage and the `calculate_nutrition` agent tool.

/// Mifflin-St Jeor BMR, TDEE and macronutrient targets
pub mod nutrition_calculator;

pub use nutrition_calculator::{
    activity_factor, calculate_nutrition, goal_multiplier, mifflin_st_jeor_bmr,
    vitamin_suggestions, NutritionInputs,
};
