// ABOUTME: Integration tests for the meal planning pipeline stages and batch runner
// ABOUTME: Drives every stage against scripted agents and an in-memory database
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

#![allow(missing_docs, clippy::unwrap_used, clippy::float_cmp)]

mod common;

use common::{
    create_test_user, happy_harness, harness_with, test_config, ScriptedLlmProvider,
    ScriptedReply, TEST_BASE_URL,
};
use nourish_server::{
    agents::AgentKind,
    constants::plan_keys::{IMAGE_REF, RECIPE},
    errors::ErrorCode,
    models::{ImageRef, MealPlan},
    pipeline::{PipelineStage, StageOutcome},
};
use serde_json::json;

#[tokio::test]
async fn test_nutrition_stage_stores_analyst_report() {
    let harness = happy_harness().await;
    let db = &harness.resources.database;
    let user = create_test_user(db, "Asha", "+919876543210").await;

    let outcome = harness
        .resources
        .pipeline_context()
        .run_stage(PipelineStage::Nutrition, user.id)
        .await
        .unwrap();
    assert!(matches!(outcome, StageOutcome::Completed { .. }));

    let report = db.get_nutrition_report(user.id).await.unwrap().unwrap();
    assert_eq!(report.calories(), 2100);
    assert_eq!(report.protein_g(), 140);
    assert_eq!(report.micronutrients()[0], "Vitamin B12");
    assert!(report.targets.bmr > 1600.0);

    let payload = &harness.llm.payloads(AgentKind::NutritionAnalyst)[0];
    assert_eq!(payload["user"]["name"], "Asha");
    assert!(payload["baseline"]["calories"].is_number());
}

#[tokio::test]
async fn test_nutrition_stage_falls_back_to_calculator_report() {
    let harness = happy_harness().await;
    harness.llm.push(
        AgentKind::NutritionAnalyst,
        ScriptedReply::Text("I could not decide on a report today.".into()),
    );
    let db = &harness.resources.database;
    let user = create_test_user(db, "Ravi", "+919800000001").await;

    let outcome = harness
        .resources
        .pipeline_context()
        .run_stage(PipelineStage::Nutrition, user.id)
        .await
        .unwrap();
    assert!(outcome.is_skipped());
    assert!(!outcome.blocks_downstream());

    let report = db.get_nutrition_report(user.id).await.unwrap().unwrap();
    assert_eq!(report.calories(), report.targets.calories);
    assert!(!report.human_summary().is_empty());
}

#[tokio::test]
async fn test_full_stage_sequence_for_one_user() {
    let harness = happy_harness().await;
    let db = &harness.resources.database;
    let user = create_test_user(db, "Asha", "+919876543210").await;

    let run = harness
        .resources
        .pipeline
        .run_for_user(user.id, &PipelineStage::all())
        .await;
    assert!(run.succeeded(), "unexpected failure: {:?}", run.failure);
    assert_eq!(run.outcomes.len(), 6);
    assert!(run.outcomes.iter().all(|o| !o.is_skipped()));

    let plan = db.get_meal_plan_by_user(user.id).await.unwrap().unwrap();
    assert_eq!(plan.day_labels(), vec!["Day 1", "Day 2"]);
    assert_eq!(plan.dishes().len(), 6);
    assert_eq!(plan.day_summary("Day 2"), Some("Light and balanced"));

    for dish in plan.dishes() {
        let entry = plan.dish_entry(&dish.day, &dish.slot).unwrap();
        let image: ImageRef = serde_json::from_value(entry[IMAGE_REF].clone()).unwrap();
        assert_eq!(
            image.url.as_deref(),
            Some(format!("{TEST_BASE_URL}/images/{}", image.blob_id).as_str())
        );
        assert!(db.get_image(image.blob_id).await.unwrap().is_some());
        assert_eq!(entry[RECIPE]["cook_time"], "20 minutes");
    }
    assert_eq!(db.count_images().await.unwrap(), 6);

    let list = db.get_shopping_list_for_user(user.id).await.unwrap().unwrap();
    assert_eq!(list.source_meal_plan_id, plan.id);
    assert_eq!(list.item_count(), 5);
    let pricing = list.pricing.unwrap();
    assert_eq!(pricing.grand_total, 285.0);
    assert_eq!(pricing.currency, "INR");
    assert_eq!(pricing.categories["Vegetables"].items[1].price, 40.0);
}

#[tokio::test]
async fn test_recipe_payload_is_keyed_by_dish_without_image_ref() {
    let harness = happy_harness().await;
    let db = &harness.resources.database;
    let user = create_test_user(db, "Asha", "+919876543210").await;
    harness
        .resources
        .pipeline
        .run_for_user(
            user.id,
            &[
                PipelineStage::Nutrition,
                PipelineStage::MealPlan,
                PipelineStage::Images,
                PipelineStage::Recipes,
            ],
        )
        .await;

    let payloads = harness.llm.payloads(AgentKind::RecipeGenerator);
    assert_eq!(payloads.len(), 6);
    let first = payloads[0].as_object().unwrap();
    assert_eq!(first.keys().next().map(String::as_str), Some("Poha"));
    assert!(first["Poha"].get(IMAGE_REF).is_none());
    assert_eq!(first["Poha"]["meal_name"], "Breakfast");
}

#[tokio::test]
async fn test_unparseable_meal_plan_halts_downstream_stages() {
    let harness = happy_harness().await;
    harness.llm.push(
        AgentKind::MealPlanner,
        ScriptedReply::Text("Plan coming soon!".into()),
    );
    let db = &harness.resources.database;
    let user = create_test_user(db, "Asha", "+919876543210").await;

    let run = harness
        .resources
        .pipeline
        .run_for_user(user.id, &PipelineStage::all())
        .await;
    assert!(run.succeeded());
    assert_eq!(run.outcomes.len(), 2);
    assert!(run.outcomes[1].blocks_downstream());
    assert!(db.get_meal_plan_by_user(user.id).await.unwrap().is_none());
    assert_eq!(harness.llm.call_count(AgentKind::RecipeGenerator), 0);
}

#[tokio::test]
async fn test_meal_plan_without_report_is_not_found() {
    let harness = happy_harness().await;
    let user = create_test_user(&harness.resources.database, "Asha", "+919876543210").await;

    let run = harness
        .resources
        .pipeline
        .run_for_user(user.id, &[PipelineStage::MealPlan, PipelineStage::Images])
        .await;
    let failure = run.failure.unwrap();
    assert_eq!(failure.stage, PipelineStage::MealPlan);
    assert_eq!(failure.code, format!("{:?}", ErrorCode::ResourceNotFound));
    assert!(run.outcomes.is_empty());
    assert_eq!(harness.llm.call_count(AgentKind::MealPlanner), 0);
}

#[tokio::test]
async fn test_image_failures_are_retried_on_next_run() {
    let harness = happy_harness().await;
    let mut plan = common::meal_plan_reply();
    plan["Day 1"]["Dinner"]["dish_name"] = json!("Burnt Toast");
    harness
        .llm
        .set_default(AgentKind::MealPlanner, plan.to_string());
    let db = &harness.resources.database;
    let user = create_test_user(db, "Asha", "+919876543210").await;
    let ctx = harness.resources.pipeline_context();

    ctx.run_stage(PipelineStage::Nutrition, user.id).await.unwrap();
    ctx.run_stage(PipelineStage::MealPlan, user.id).await.unwrap();
    let outcome = ctx.run_stage(PipelineStage::Images, user.id).await.unwrap();
    match outcome {
        StageOutcome::Completed { detail, .. } => assert_eq!(detail, "attached 5 of 6 images"),
        other => panic!("unexpected outcome {other:?}"),
    }

    let plan = db.get_meal_plan_by_user(user.id).await.unwrap().unwrap();
    assert!(plan
        .dish_entry("Day 1", "Dinner")
        .unwrap()
        .get(IMAGE_REF)
        .is_none());

    ctx.run_stage(PipelineStage::Images, user.id).await.unwrap();
    let requested = harness.images.requested();
    assert_eq!(requested.len(), 7);
    assert_eq!(requested.last().map(String::as_str), Some("Burnt Toast"));
}

#[tokio::test]
async fn test_images_stage_skipped_when_disabled() {
    let mut config = test_config();
    config.images.enabled = false;
    let llm = ScriptedLlmProvider::happy_path(config.pipeline.plan_days);
    let harness = harness_with(config, llm).await;
    let user = create_test_user(&harness.resources.database, "Asha", "+919876543210").await;

    let outcome = harness
        .resources
        .pipeline_context()
        .run_stage(PipelineStage::Images, user.id)
        .await
        .unwrap();
    assert!(outcome.is_skipped());
    assert!(harness.images.requested().is_empty());
}

#[tokio::test]
async fn test_recipe_parse_failure_leaves_dish_for_rerun() {
    let harness = happy_harness().await;
    harness.llm.push(
        AgentKind::RecipeGenerator,
        ScriptedReply::Text("Just boil it.".into()),
    );
    let db = &harness.resources.database;
    let user = create_test_user(db, "Asha", "+919876543210").await;
    let ctx = harness.resources.pipeline_context();

    ctx.run_stage(PipelineStage::Nutrition, user.id).await.unwrap();
    ctx.run_stage(PipelineStage::MealPlan, user.id).await.unwrap();
    ctx.run_stage(PipelineStage::Recipes, user.id).await.unwrap();

    let plan = db.get_meal_plan_by_user(user.id).await.unwrap().unwrap();
    assert!(plan.dish_entry("Day 1", "Breakfast").unwrap().get(RECIPE).is_none());
    assert!(plan.dish_entry("Day 1", "Lunch").unwrap().get(RECIPE).is_some());

    ctx.run_stage(PipelineStage::Recipes, user.id).await.unwrap();
    assert_eq!(harness.llm.call_count(AgentKind::RecipeGenerator), 7);
    let plan = db.get_meal_plan_by_user(user.id).await.unwrap().unwrap();
    assert!(plan.dish_entry("Day 1", "Breakfast").unwrap().get(RECIPE).is_some());
}

#[tokio::test]
async fn test_regenerated_plan_keeps_id() {
    let harness = happy_harness().await;
    let db = &harness.resources.database;
    let user = create_test_user(db, "Asha", "+919876543210").await;
    let ctx = harness.resources.pipeline_context();

    ctx.run_stage(PipelineStage::Nutrition, user.id).await.unwrap();
    ctx.run_stage(PipelineStage::MealPlan, user.id).await.unwrap();
    let first = db.get_meal_plan_by_user(user.id).await.unwrap().unwrap();
    ctx.run_stage(PipelineStage::MealPlan, user.id).await.unwrap();
    let second = db.get_meal_plan_by_user(user.id).await.unwrap().unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(db.list_meal_plans().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_regenerating_plan_deletes_its_old_images() {
    let harness = happy_harness().await;
    let db = &harness.resources.database;
    let user = create_test_user(db, "Asha", "+919876543210").await;
    let ctx = harness.resources.pipeline_context();

    ctx.run_stage(PipelineStage::Nutrition, user.id).await.unwrap();
    ctx.run_stage(PipelineStage::MealPlan, user.id).await.unwrap();
    ctx.run_stage(PipelineStage::Images, user.id).await.unwrap();
    let first = db.get_meal_plan_by_user(user.id).await.unwrap().unwrap();
    let old_blobs = MealPlan::image_blob_ids(&first.days);
    assert_eq!(old_blobs.len(), 6);
    assert_eq!(db.count_images().await.unwrap(), 6);

    ctx.run_stage(PipelineStage::MealPlan, user.id).await.unwrap();
    assert_eq!(db.count_images().await.unwrap(), 0);
    for blob_id in &old_blobs {
        assert!(db.get_image(*blob_id).await.unwrap().is_none());
    }

    ctx.run_stage(PipelineStage::Images, user.id).await.unwrap();
    let second = db.get_meal_plan_by_user(user.id).await.unwrap().unwrap();
    let new_blobs = MealPlan::image_blob_ids(&second.days);
    assert_eq!(new_blobs.len(), 6);
    assert!(new_blobs.iter().all(|id| !old_blobs.contains(id)));
    assert_eq!(db.count_images().await.unwrap(), 6);
}

#[tokio::test]
async fn test_images_stage_rerun_changes_nothing() {
    let harness = happy_harness().await;
    let db = &harness.resources.database;
    let user = create_test_user(db, "Asha", "+919876543210").await;
    let ctx = harness.resources.pipeline_context();

    ctx.run_stage(PipelineStage::Nutrition, user.id).await.unwrap();
    ctx.run_stage(PipelineStage::MealPlan, user.id).await.unwrap();
    ctx.run_stage(PipelineStage::Images, user.id).await.unwrap();
    let before = db.get_meal_plan_by_user(user.id).await.unwrap().unwrap();
    let requested = harness.images.requested().len();
    let stored = db.count_images().await.unwrap();
    assert_eq!(requested, 6);

    let outcome = ctx.run_stage(PipelineStage::Images, user.id).await.unwrap();
    match outcome {
        StageOutcome::Completed { detail, .. } => {
            assert_eq!(detail, "all dishes already have images");
        }
        other => panic!("unexpected outcome {other:?}"),
    }

    let after = db.get_meal_plan_by_user(user.id).await.unwrap().unwrap();
    assert_eq!(harness.images.requested().len(), requested);
    assert_eq!(db.count_images().await.unwrap(), stored);
    assert_eq!(after.days, before.days);
    assert_eq!(after.updated_at, before.updated_at);
}

#[tokio::test]
async fn test_shopping_list_provider_error_is_reported() {
    let harness = happy_harness().await;
    harness.llm.push(
        AgentKind::ShoppingListGenerator,
        ScriptedReply::Error(ErrorCode::ExternalAuthFailed),
    );
    let user = create_test_user(&harness.resources.database, "Asha", "+919876543210").await;

    let run = harness
        .resources
        .pipeline
        .run_for_user(
            user.id,
            &[
                PipelineStage::Nutrition,
                PipelineStage::MealPlan,
                PipelineStage::ShoppingList,
                PipelineStage::Pricing,
            ],
        )
        .await;
    let failure = run.failure.unwrap();
    assert_eq!(failure.stage, PipelineStage::ShoppingList);
    assert_eq!(failure.code, format!("{:?}", ErrorCode::ExternalAuthFailed));
    assert_eq!(run.outcomes.len(), 2);
    assert_eq!(harness.llm.call_count(AgentKind::PricePredictor), 0);
}

#[tokio::test]
async fn test_batch_isolates_failing_users() {
    let harness = happy_harness().await;
    let db = &harness.resources.database;
    let ready = create_test_user(db, "Asha", "+919876543210").await;
    let unprepared = create_test_user(db, "Ravi", "+919800000001").await;
    harness
        .resources
        .pipeline_context()
        .run_stage(PipelineStage::Nutrition, ready.id)
        .await
        .unwrap();

    let report = harness.resources.pipeline.run_batch().await.unwrap();
    assert_eq!(report.per_user.len(), 2);
    assert_eq!(report.succeeded_users(), 1);
    assert_eq!(report.failed_users(), 1);

    let failed = report.per_user.iter().find(|r| !r.succeeded()).unwrap();
    assert_eq!(failed.user_id, unprepared.id);
    assert_eq!(report.pricing.len(), 1);
    assert!(report.pricing_failures.is_empty());
    assert!(db
        .get_shopping_list_for_user(ready.id)
        .await
        .unwrap()
        .unwrap()
        .pricing
        .is_some());
}

#[tokio::test]
async fn test_unparseable_pricing_is_skipped() {
    let harness = happy_harness().await;
    harness.llm.push(
        AgentKind::PricePredictor,
        ScriptedReply::Text(json!({"note": "prices unavailable"}).to_string()),
    );
    let db = &harness.resources.database;
    let user = create_test_user(db, "Asha", "+919876543210").await;

    let run = harness
        .resources
        .pipeline
        .run_for_user(
            user.id,
            &[
                PipelineStage::Nutrition,
                PipelineStage::MealPlan,
                PipelineStage::ShoppingList,
                PipelineStage::Pricing,
            ],
        )
        .await;
    assert!(run.succeeded());
    assert!(run.outcomes[3].is_skipped());
    let list = db.get_shopping_list_for_user(user.id).await.unwrap().unwrap();
    assert!(list.pricing.is_none());
}
