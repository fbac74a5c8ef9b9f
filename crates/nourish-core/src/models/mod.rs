// ABOUTME: Core data models for the Nourish meal-planning pipeline
// ABOUTME: Profiles, nutrition targets and reports, meal plans, shopping lists and pricing
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! # Data Models
//!
//! Every derived document references the identity of its immediate upstream
//! document, and at most one current version exists per user per stage:
//!
//! `UserProfile` → `NutritionReport` → `MealPlan` → `ShoppingList` (+ `PricingDetails`)

mod meal_plan;
mod nutrition;
mod profile;
mod shopping;

pub use meal_plan::{DishRef, ImageRef, MealPlan, Recipe};
pub use nutrition::{
    ActivityLevel, CalculatorWarning, DietType, Gender, Goal, NutritionReport, NutritionTargets,
};
pub use profile::{ProfileSubmission, UserProfile};
pub use shopping::{PricedCategory, PricedItem, PricingDetails, ShoppingList};
