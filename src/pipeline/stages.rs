// ABOUTME: Stage functions that read stored inputs, invoke an agent and store the result
// ABOUTME: Parse failures become skipped outcomes; missing inputs stay errors
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use serde_json::{json, Map, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use super::{PipelineContext, PipelineStage, StageOutcome};
use crate::agents::AgentKind;
use crate::config::NutritionConfig;
use crate::constants::plan_keys::{IMAGE_REF, RECIPE};
use crate::errors::{AppError, AppResult};
use crate::intelligence::{calculate_nutrition, NutritionInputs};
use crate::models::{
    ImageRef, MealPlan, NutritionReport, PricingDetails, ShoppingList, UserProfile,
};

async fn load_user(ctx: &PipelineContext, user_id: Uuid) -> AppResult<UserProfile> {
    ctx.database
        .get_user(user_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("User {user_id}")))
}

async fn load_report(ctx: &PipelineContext, user_id: Uuid) -> AppResult<NutritionReport> {
    ctx.database
        .get_nutrition_report(user_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Nutrition report for user {user_id}")))
}

async fn load_plan(ctx: &PipelineContext, user_id: Uuid) -> AppResult<MealPlan> {
    ctx.database
        .get_meal_plan_by_user(user_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Meal plan for user {user_id}")))
}

/// Plan days without internal image references
fn days_for_agent(days: &Map<String, Value>) -> Value {
    let mut view = days.clone();
    for meals in view.values_mut().filter_map(Value::as_object_mut) {
        for entry in meals.values_mut().filter_map(Value::as_object_mut) {
            entry.remove(IMAGE_REF);
        }
    }
    Value::Object(view)
}

const fn completed(stage: PipelineStage, user_id: Uuid, detail: String) -> StageOutcome {
    StageOutcome::Completed {
        stage,
        user_id,
        detail,
    }
}

const fn skipped(stage: PipelineStage, user_id: Uuid, reason: String) -> StageOutcome {
    StageOutcome::Skipped {
        stage,
        user_id,
        reason,
    }
}

/// Calculator baseline plus Nutrition Analyst report
///
/// When the analyst's answer cannot be parsed the calculator-only report is
/// stored, so the user always ends up with usable targets.
///
/// # Errors
///
/// Returns `ResourceNotFound` for an unknown user, or an agent/database error.
pub async fn run_nutrition(ctx: &PipelineContext, user_id: Uuid) -> AppResult<StageOutcome> {
    let stage = PipelineStage::Nutrition;
    let user = load_user(ctx, user_id).await?;
    let targets = calculate_nutrition(&NutritionInputs::from_profile(&user), NutritionConfig::global());

    let payload = json!({
        "user": user.to_agent_payload(),
        "baseline": targets.to_tool_result(),
    });

    match ctx.agents.invoke_json(AgentKind::NutritionAnalyst, &payload).await {
        Ok(report) => {
            let stored = ctx
                .database
                .upsert_nutrition_report(user_id, &targets, &report)
                .await?;
            Ok(completed(
                stage,
                user_id,
                format!("{} kcal/day, report {}", stored.calories(), stored.id),
            ))
        }
        Err(e) if e.is_parse_failure() => {
            ctx.database
                .upsert_nutrition_report(user_id, &targets, &targets.to_report_json())
                .await?;
            Ok(skipped(
                stage,
                user_id,
                format!("analyst output unparseable, stored calculator report: {}", e.message),
            ))
        }
        Err(e) => Err(e),
    }
}

/// Meal Planner over the profile and the current nutrition report
///
/// # Errors
///
/// Returns `ResourceNotFound` when the user or report is missing, or an
/// agent/database error.
pub async fn run_meal_plan(ctx: &PipelineContext, user_id: Uuid) -> AppResult<StageOutcome> {
    let stage = PipelineStage::MealPlan;
    let user = load_user(ctx, user_id).await?;
    let report = load_report(ctx, user_id).await?;

    let payload = json!({
        "user": user.to_agent_payload(),
        "nutrition_report": report.to_agent_payload(),
    });

    let raw = match ctx.agents.invoke_json(AgentKind::MealPlanner, &payload).await {
        Ok(Value::Object(map)) => map,
        Ok(_) => return Ok(skipped(stage, user_id, "planner output is not an object".into())),
        Err(e) if e.is_parse_failure() => return Ok(skipped(stage, user_id, e.message)),
        Err(e) => return Err(e),
    };

    let days = MealPlan::normalize_days(raw);
    if days.is_empty() {
        return Ok(skipped(stage, user_id, "planner output has no day entries".into()));
    }

    let plan = ctx
        .database
        .upsert_meal_plan(user_id, report.id, &days)
        .await?;
    Ok(completed(
        stage,
        user_id,
        format!("plan {} with {} dishes", plan.id, plan.dishes().len()),
    ))
}

/// Generate, store and publish an image for every dish without one
///
/// Per-dish failures are logged and left for the next run.
///
/// # Errors
///
/// Returns `ResourceNotFound` when the plan is missing, or a database error
/// while persisting.
pub async fn run_images(ctx: &PipelineContext, user_id: Uuid) -> AppResult<StageOutcome> {
    let stage = PipelineStage::Images;
    if !ctx.config.images.enabled {
        return Ok(skipped(stage, user_id, "image generation disabled".into()));
    }

    let mut plan = load_plan(ctx, user_id).await?;
    let pending: Vec<_> = plan
        .dishes()
        .into_iter()
        .filter(|dish| {
            plan.dish_entry(&dish.day, &dish.slot)
                .is_some_and(|entry| !entry.contains_key(IMAGE_REF))
        })
        .collect();

    if pending.is_empty() {
        return Ok(completed(stage, user_id, "all dishes already have images".into()));
    }

    let mut stored = Vec::new();
    for dish in &pending {
        let image = match ctx.image_generator.generate(&dish.dish_name).await {
            Ok(image) => image,
            Err(e) => {
                warn!(dish = %dish.dish_name, day = %dish.day, error = %e, "Image generation failed");
                continue;
            }
        };

        let key = MealPlan::image_key(&dish.day, &dish.dish_name);
        let blob_id = match ctx
            .database
            .store_image(&key, &image.content_type, &image.bytes)
            .await
        {
            Ok(id) => id,
            Err(e) => {
                warn!(dish = %dish.dish_name, error = %e, "Failed to store image");
                continue;
            }
        };

        let url = match ctx.image_host.publish(blob_id, &key, &image).await {
            Ok(url) => Some(url),
            Err(e) => {
                warn!(dish = %dish.dish_name, error = %e, "Failed to publish image");
                None
            }
        };

        let image_ref = ImageRef { blob_id, key, url };
        if let Some(entry) = plan.dish_entry_mut(&dish.day, &dish.slot) {
            entry.insert(IMAGE_REF.to_owned(), serde_json::to_value(&image_ref)?);
            stored.push(blob_id);
        }
    }

    let attached = stored.len();
    if attached > 0 {
        if let Err(e) = ctx.database.update_meal_plan_days(plan.id, &plan.days).await {
            if let Err(cleanup) = ctx.database.delete_images(&stored).await {
                warn!(error = %cleanup, "Failed to delete images after plan update failure");
            }
            return Err(e);
        }
    }
    Ok(completed(
        stage,
        user_id,
        format!("attached {attached} of {} images", pending.len()),
    ))
}

/// Recipe Generator for every dish without a recipe
///
/// Unparseable or failed recipes are skipped so a rerun retries them.
///
/// # Errors
///
/// Returns `ResourceNotFound` when the plan is missing, or a database error
/// while persisting.
pub async fn run_recipes(ctx: &PipelineContext, user_id: Uuid) -> AppResult<StageOutcome> {
    let stage = PipelineStage::Recipes;
    let mut plan = load_plan(ctx, user_id).await?;

    let mut pending = Vec::new();
    for dish in plan.dishes() {
        let Some(entry) = plan.dish_entry(&dish.day, &dish.slot) else {
            continue;
        };
        if entry.contains_key(RECIPE) {
            debug!(dish = %dish.dish_name, "Recipe already present");
            continue;
        }
        let mut details = entry.clone();
        details.remove(IMAGE_REF);
        pending.push((dish, details));
    }

    if pending.is_empty() {
        return Ok(completed(stage, user_id, "all dishes already have recipes".into()));
    }

    let mut attached = 0_usize;
    for (dish, details) in &pending {
        let payload = json!({ dish.dish_name.clone(): details });
        let recipe = match ctx.agents.invoke_json(AgentKind::RecipeGenerator, &payload).await {
            Ok(recipe) => recipe,
            Err(e) => {
                warn!(dish = %dish.dish_name, error = %e, "Recipe generation failed, will retry next run");
                continue;
            }
        };
        if let Some(entry) = plan.dish_entry_mut(&dish.day, &dish.slot) {
            entry.insert(RECIPE.to_owned(), recipe);
            attached += 1;
        }
    }

    if attached > 0 {
        ctx.database.update_meal_plan_days(plan.id, &plan.days).await?;
    }
    Ok(completed(
        stage,
        user_id,
        format!("attached {attached} of {} recipes", pending.len()),
    ))
}

/// Shopping List Generator over the current plan
///
/// # Errors
///
/// Returns `ResourceNotFound` when the plan is missing, or an agent/database
/// error.
pub async fn run_shopping_list(ctx: &PipelineContext, user_id: Uuid) -> AppResult<StageOutcome> {
    let stage = PipelineStage::ShoppingList;
    let plan = load_plan(ctx, user_id).await?;

    let raw = match ctx
        .agents
        .invoke_json(AgentKind::ShoppingListGenerator, &days_for_agent(&plan.days))
        .await
    {
        Ok(raw) => raw,
        Err(e) if e.is_parse_failure() => return Ok(skipped(stage, user_id, e.message)),
        Err(e) => return Err(e),
    };

    let categories = ShoppingList::normalize_categories(&raw);
    if categories.is_empty() {
        return Ok(skipped(stage, user_id, "shopping list has no categories".into()));
    }

    let list = ctx
        .database
        .upsert_shopping_list(user_id, plan.id, &categories)
        .await?;
    Ok(completed(
        stage,
        user_id,
        format!(
            "list {} with {} items in {} categories",
            list.id,
            list.item_count(),
            list.categories.len()
        ),
    ))
}

/// Price Predictor over the user's shopping list
///
/// # Errors
///
/// Returns `ResourceNotFound` when the user has no list, or an
/// agent/database error.
pub async fn run_pricing(ctx: &PipelineContext, user_id: Uuid) -> AppResult<StageOutcome> {
    let list = ctx
        .database
        .get_shopping_list_for_user(user_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Shopping list for user {user_id}")))?;
    price_list(ctx, &list).await
}

/// Price one stored shopping list
///
/// # Errors
///
/// Returns an agent or database error; unparseable predictions are skipped.
pub async fn price_list(ctx: &PipelineContext, list: &ShoppingList) -> AppResult<StageOutcome> {
    let stage = PipelineStage::Pricing;
    let payload = serde_json::to_value(&list.categories)?;

    let raw = match ctx.agents.invoke_json(AgentKind::PricePredictor, &payload).await {
        Ok(raw) => raw,
        Err(e) if e.is_parse_failure() => return Ok(skipped(stage, list.user_id, e.message)),
        Err(e) => return Err(e),
    };

    let pricing = match PricingDetails::from_agent_value(&raw) {
        Ok(pricing) => pricing,
        Err(e) => return Ok(skipped(stage, list.user_id, e.message)),
    };

    ctx.database.set_pricing(list.id, &pricing).await?;
    Ok(completed(
        stage,
        list.user_id,
        format!(
            "list {} priced at {:.2} {}",
            list.id, pricing.grand_total, pricing.currency
        ),
    ))
}
