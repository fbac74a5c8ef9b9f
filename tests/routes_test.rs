// ABOUTME: HTTP tests for the JSON API through the full router and middleware stack
// ABOUTME: Session headers, generation endpoints, dashboard, images, notify and error shapes
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

#![allow(missing_docs, clippy::unwrap_used, clippy::float_cmp)]

mod common;
mod helpers;

use axum::http::StatusCode;
use axum::Router;
use common::{happy_harness, sample_submission, TestHarness, MESSAGE_REPLY, TEST_BASE_URL};
use helpers::axum_test::AxumTestRequest;
use nourish_server::routes::build_router;
use serde_json::{json, Value};
use uuid::Uuid;

const PHONE: &str = "+919876543210";

fn app(harness: &TestHarness) -> Router {
    build_router(harness.resources.clone())
}

/// Submit the sample profile and return the response body
async fn submit_profile(harness: &TestHarness) -> Value {
    let submission = sample_submission("Asha", "098765 43210");
    AxumTestRequest::post("/api/profile")
        .json(&submission)
        .send(app(harness))
        .await
        .assert_status(StatusCode::OK)
        .json()
}

async fn generate_plan(harness: &TestHarness) -> Value {
    AxumTestRequest::post("/api/me/meal-plan")
        .as_phone(PHONE)
        .send(app(harness))
        .await
        .assert_status(StatusCode::OK)
        .json()
}

#[tokio::test]
async fn test_health() {
    let harness = happy_harness().await;
    let response = AxumTestRequest::get("/health").send(app(&harness)).await;

    assert_eq!(response.status(), 200);
    assert!(response.header("x-request-id").is_some());
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"]["status"], "ok");
}

#[tokio::test]
async fn test_request_id_is_propagated() {
    let harness = happy_harness().await;
    let response = AxumTestRequest::get("/health")
        .header("x-request-id", "req-123")
        .send(app(&harness))
        .await;
    assert_eq!(response.header("x-request-id"), Some("req-123"));
}

#[tokio::test]
async fn test_profile_submission_normalizes_phone_and_runs_nutrition() {
    let harness = happy_harness().await;
    let body = submit_profile(&harness).await;

    assert_eq!(body["profile"]["phone"], PHONE);
    assert_eq!(body["outcome"]["status"], "completed");
    assert_eq!(body["outcome"]["stage"], "nutrition");
    assert_eq!(body["nutrition"]["calories"], 2100);
    assert_eq!(body["nutrition"]["summary"], "A high-protein vegetarian plan for steady weight loss.");

    let again = submit_profile(&harness).await;
    assert_eq!(again["profile"]["id"], body["profile"]["id"]);
    assert_eq!(harness.resources.database.list_users().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_invalid_profile_is_rejected() {
    let harness = happy_harness().await;
    let mut submission = sample_submission("Asha", PHONE);
    submission.age = 0;

    let body: Value = AxumTestRequest::post("/api/profile")
        .json(&submission)
        .send(app(&harness))
        .await
        .assert_status(StatusCode::BAD_REQUEST)
        .json();
    assert_eq!(body["error"]["code"], "INVALID_INPUT");
    assert!(harness.resources.database.list_users().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_session_resolution() {
    let harness = happy_harness().await;
    let body = submit_profile(&harness).await;
    let user_id = body["profile"]["id"].as_str().unwrap().to_owned();

    let by_local_phone: Value = AxumTestRequest::get("/api/me/profile")
        .as_phone("09876543210")
        .send(app(&harness))
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(by_local_phone["id"], user_id.as_str());

    AxumTestRequest::get("/api/me/profile")
        .header("x-user-id", &user_id)
        .send(app(&harness))
        .await
        .assert_status(StatusCode::OK);

    let missing: Value = AxumTestRequest::get("/api/me/profile")
        .send(app(&harness))
        .await
        .assert_status(StatusCode::BAD_REQUEST)
        .json();
    assert_eq!(missing["error"]["code"], "MISSING_REQUIRED_FIELD");

    let unknown: Value = AxumTestRequest::get("/api/me/profile")
        .header("x-user-id", &Uuid::new_v4().to_string())
        .header("x-request-id", "req-unknown")
        .send(app(&harness))
        .await
        .assert_status(StatusCode::NOT_FOUND)
        .json();
    assert_eq!(unknown["error"]["code"], "RESOURCE_NOT_FOUND");

    AxumTestRequest::get("/api/me/profile")
        .header("x-user-id", "not-a-uuid")
        .send(app(&harness))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_nutrition_and_plan_are_not_found_before_generation() {
    let harness = happy_harness().await;
    harness
        .resources
        .database
        .upsert_user_by_phone(&sample_submission("Asha", PHONE))
        .await
        .unwrap();

    for uri in ["/api/me/nutrition", "/api/me/meal-plan", "/api/me/shopping-list", "/api/me/dashboard"] {
        let body: Value = AxumTestRequest::get(uri)
            .as_phone(PHONE)
            .header("x-request-id", "req-404")
            .send(app(&harness))
            .await
            .assert_status(StatusCode::NOT_FOUND)
            .json();
        assert_eq!(body["error"]["request_id"], "req-404", "uri {uri}");
    }
}

#[tokio::test]
async fn test_meal_plan_generation_and_recipes() {
    let harness = happy_harness().await;
    submit_profile(&harness).await;

    let generated = generate_plan(&harness).await;
    assert!(generated["run"]["failure"].is_null());
    assert_eq!(generated["run"]["outcomes"].as_array().unwrap().len(), 2);

    let days = generated["meal_plan"]["days"].as_array().unwrap();
    assert_eq!(days.len(), 2);
    assert_eq!(days[0]["label"], "Day 1");
    assert_eq!(days[0]["summary"], "High protein day");
    let breakfast = &days[0]["meals"][0];
    assert_eq!(breakfast["slot"], "Breakfast");
    assert_eq!(breakfast["dish_name"], "Poha");
    assert_eq!(breakfast["protein_percentage"], "20%");
    assert!(breakfast["image_url"]
        .as_str()
        .unwrap()
        .starts_with(&format!("{TEST_BASE_URL}/images/")));
    assert!(breakfast["recipe"].is_null());

    let with_recipes: Value = AxumTestRequest::post("/api/me/recipes")
        .as_phone(PHONE)
        .send(app(&harness))
        .await
        .assert_status(StatusCode::OK)
        .json();
    let recipe = &with_recipes["meal_plan"]["days"][1]["meals"][2]["recipe"];
    assert_eq!(recipe["prep_time"], "10 minutes");
    assert_eq!(recipe["steps"]["step-10"], "Serve hot.");

    let fetched: Value = AxumTestRequest::get("/api/me/meal-plan")
        .as_phone(PHONE)
        .send(app(&harness))
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(fetched["id"], generated["meal_plan"]["id"]);
}

#[tokio::test]
async fn test_served_image_bytes() {
    let harness = happy_harness().await;
    submit_profile(&harness).await;
    let generated = generate_plan(&harness).await;

    let url = generated["meal_plan"]["days"][0]["meals"][0]["image_url"]
        .as_str()
        .unwrap()
        .to_owned();
    let path = url.strip_prefix(TEST_BASE_URL).unwrap();

    let response = AxumTestRequest::get(path).send(app(&harness)).await;
    assert_eq!(response.status(), 200);
    assert_eq!(response.header("content-type"), Some("image/png"));
    assert!(response.header("cache-control").is_some());
    assert_eq!(&response.bytes()[..4], &[0x89, b'P', b'N', b'G']);

    AxumTestRequest::get(&format!("/images/{}", Uuid::new_v4()))
        .send(app(&harness))
        .await
        .assert_status(StatusCode::NOT_FOUND);
    AxumTestRequest::get("/images/latest")
        .send(app(&harness))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_shopping_list_and_dashboard() {
    let harness = happy_harness().await;
    submit_profile(&harness).await;
    generate_plan(&harness).await;

    let shopping: Value = AxumTestRequest::post("/api/me/shopping-list")
        .as_phone(PHONE)
        .send(app(&harness))
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(shopping["shopping_list"]["categories"]["Dairy"], json!(["Paneer"]));
    assert_eq!(shopping["shopping_list"]["pricing"]["grand_total"], 285.0);

    let dashboard: Value = AxumTestRequest::get("/api/me/dashboard")
        .as_phone(PHONE)
        .send(app(&harness))
        .await
        .assert_status(StatusCode::OK)
        .json();

    let macros = dashboard["macros"].as_array().unwrap();
    assert_eq!(macros[0]["name"], "Protein");
    assert_eq!(macros[0]["grams"], 140);
    assert_eq!(macros[0]["kcal"], 560.0);
    assert_eq!(macros[2]["kcal"], 522.0);
    assert_eq!(dashboard["calories"]["reported"], 2100);
    assert_eq!(dashboard["calories"]["target"], 2172);
    assert_eq!(dashboard["meals"].as_array().unwrap().len(), 6);
    assert_eq!(dashboard["meals"][0]["protein_percentage"], 20.0);
    assert_eq!(dashboard["costs"]["grand_total"], 285.0);
    assert_eq!(dashboard["costs"]["items"][0]["item"], "Onion");
}

#[tokio::test]
async fn test_notify_sends_for_session_user() {
    let harness = happy_harness().await;
    submit_profile(&harness).await;
    generate_plan(&harness).await;

    let report: Value = AxumTestRequest::post("/api/me/notify")
        .as_phone(PHONE)
        .json(&json!({"slot_index": 2, "day": "Day 2"}))
        .send(app(&harness))
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(report["sent"], 1);

    let sent = harness.sender.sent();
    assert_eq!(sent[0].to, PHONE);
    assert!(sent[0].body.contains("*Dal Khichdi*"));
    assert!(sent[0].body.contains(MESSAGE_REPLY));

    let all: Value = AxumTestRequest::post("/api/me/notify")
        .as_phone(PHONE)
        .send(app(&harness))
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(all["sent"], 3);
}

#[tokio::test]
async fn test_calculator_endpoint() {
    let harness = happy_harness().await;
    let body: Value = AxumTestRequest::post("/api/calculator")
        .json(&json!({
            "age": 30,
            "gender": "Male",
            "weight_kg": 70.0,
            "height_cm": 175.0,
            "activity": "Moderately active",
            "goal": "Weight loss"
        }))
        .send(app(&harness))
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(body["calories"], 2172);
    assert_eq!(body["protein_g"], 140);
    assert_eq!(body["vitamins"], json!(["Vitamin D"]));

    AxumTestRequest::post("/api/calculator")
        .json(&json!({
            "age": 30, "gender": "Male", "weight_kg": 0.0, "height_cm": 175.0,
            "activity": "sedentary", "goal": "maintain"
        }))
        .send(app(&harness))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}
