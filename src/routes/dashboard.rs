// ABOUTME: Dashboard route aggregating chart-ready data for the session user
// ABOUTME: Macro split, calories against target, per-meal shares and shopping costs
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! Dashboard data
//!
//! The dashboard returns series a client can chart directly. Only the
//! nutrition report is required; plan and shopping sections are empty until
//! those stages have run.

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use serde_json::Value;

use super::session::SessionContext;
use crate::config::NutritionConfig;
use crate::constants::plan_keys::{CALORIES_PERCENTAGE, DISH_NAME, PROTEIN_PERCENTAGE};
use crate::errors::{AppError, AppResult};
use crate::models::{MealPlan, NutritionReport, PricingDetails};
use crate::resources::ServerResources;

/// One macronutrient in grams and kilocalories
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MacroAmount {
    /// Macro name
    pub name: &'static str,
    /// Daily grams
    pub grams: i64,
    /// Daily kilocalories from those grams
    pub kcal: f64,
}

/// Daily calories from the report against the calculator target
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalorieComparison {
    /// Calories in the stored report
    pub reported: i64,
    /// Calculator target
    pub target: i64,
}

/// Per-meal shares for one day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MealShare {
    /// Day label
    pub day: String,
    /// Slot key
    pub slot: String,
    /// Dish name
    pub dish_name: String,
    /// Percentage of daily calories
    pub calories_percentage: Option<f64>,
    /// Percentage of daily protein
    pub protein_percentage: Option<f64>,
}

/// Category cost slice
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryCost {
    /// Category name
    pub category: String,
    /// Category total
    pub cost: f64,
}

/// Single priced item
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemPrice {
    /// Item name
    pub item: String,
    /// Item price
    pub price: f64,
}

/// Shopping cost section
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostSummary {
    /// Cost per category
    pub breakdown: Vec<CategoryCost>,
    /// Every item, cheapest first
    pub items: Vec<ItemPrice>,
    /// Sum over all categories
    pub grand_total: f64,
    /// Currency code
    pub currency: String,
}

/// Everything the dashboard charts need
#[derive(Debug, Clone, Serialize)]
pub struct DashboardData {
    /// Macro split
    pub macros: Vec<MacroAmount>,
    /// Calories against target
    pub calories: CalorieComparison,
    /// Per-meal shares across the plan
    pub meals: Vec<MealShare>,
    /// Shopping costs, once priced
    pub costs: Option<CostSummary>,
}

/// Read `25`, `25.5` or `"25%"` as a number
fn percentage(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse().ok(),
        _ => None,
    }
}

/// Macro split in grams and kilocalories
#[must_use]
pub fn macro_split(report: &NutritionReport, config: &NutritionConfig) -> Vec<MacroAmount> {
    let macros = &config.macronutrients;
    [
        ("Protein", report.protein_g(), macros.kcal_per_g_protein),
        ("Carbs", report.carbs_g(), macros.kcal_per_g_carbs),
        ("Fat", report.fat_g(), macros.kcal_per_g_fat),
    ]
    .into_iter()
    .map(|(name, grams, kcal_per_g)| MacroAmount {
        name,
        grams,
        kcal: grams as f64 * kcal_per_g,
    })
    .collect()
}

/// Calorie and protein shares for every dish, in plan order
#[must_use]
pub fn meal_shares(plan: &MealPlan) -> Vec<MealShare> {
    plan.day_labels()
        .into_iter()
        .flat_map(|day| {
            plan.meals_for_day(&day)
                .into_iter()
                .map(|(slot, entry)| MealShare {
                    day: day.clone(),
                    slot: slot.to_owned(),
                    dish_name: entry
                        .get(DISH_NAME)
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_owned(),
                    calories_percentage: percentage(entry.get(CALORIES_PERCENTAGE)),
                    protein_percentage: percentage(entry.get(PROTEIN_PERCENTAGE)),
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Category and item costs from pricing details
#[must_use]
pub fn cost_summary(pricing: &PricingDetails) -> CostSummary {
    let breakdown = pricing
        .cost_breakdown()
        .into_iter()
        .map(|(category, cost)| CategoryCost { category, cost })
        .collect();

    let mut items: Vec<ItemPrice> = pricing
        .categories
        .values()
        .flat_map(|category| category.items.iter())
        .map(|item| ItemPrice {
            item: item.name.clone(),
            price: item.price,
        })
        .collect();
    items.sort_by(|a, b| a.price.total_cmp(&b.price));

    CostSummary {
        breakdown,
        items,
        grand_total: pricing.grand_total,
        currency: pricing.currency.clone(),
    }
}

/// Dashboard routes implementation
pub struct DashboardRoutes;

impl DashboardRoutes {
    /// Create the dashboard route
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/me/dashboard", get(Self::handle_dashboard))
            .with_state(resources)
    }

    async fn handle_dashboard(
        State(resources): State<Arc<ServerResources>>,
        session: SessionContext,
    ) -> AppResult<Json<DashboardData>> {
        let user_id = session.user.id;
        let report = resources
            .database
            .get_nutrition_report(user_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found("Nutrition report").with_request_id(session.request_id)
            })?;
        let plan = resources.database.get_meal_plan_by_user(user_id).await?;
        let list = resources.database.get_shopping_list_for_user(user_id).await?;

        Ok(Json(DashboardData {
            macros: macro_split(&report, NutritionConfig::global()),
            calories: CalorieComparison {
                reported: report.calories(),
                target: report.targets.calories,
            },
            meals: plan.as_ref().map(meal_shares).unwrap_or_default(),
            costs: list
                .as_ref()
                .and_then(|l| l.pricing.as_ref())
                .map(cost_summary),
        }))
    }
}
