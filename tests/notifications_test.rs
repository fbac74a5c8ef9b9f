// ABOUTME: Integration tests for meal reminder dispatch
// ABOUTME: Slot selection, message composition, fallbacks and per-user failure isolation
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

#![allow(missing_docs, clippy::unwrap_used)]

mod common;

use chrono::NaiveTime;
use common::{
    create_test_user, happy_harness, harness_with, test_config, ScriptedLlmProvider,
    ScriptedReply, TestHarness, MESSAGE_REPLY, TEST_BASE_URL,
};
use nourish_server::{
    agents::AgentKind,
    errors::ErrorCode,
    models::UserProfile,
    notifications::DispatchTrigger,
    pipeline::PipelineStage,
};

/// Store a user with a nutrition report, a plan and images
async fn planned_user(harness: &TestHarness, name: &str, phone: &str) -> UserProfile {
    let user = create_test_user(&harness.resources.database, name, phone).await;
    let run = harness
        .resources
        .pipeline
        .run_for_user(
            user.id,
            &[
                PipelineStage::Nutrition,
                PipelineStage::MealPlan,
                PipelineStage::Images,
            ],
        )
        .await;
    assert!(run.succeeded());
    user
}

#[tokio::test]
async fn test_all_slots_of_rotation_day() {
    let harness = happy_harness().await;
    let user = planned_user(&harness, "Asha", "+919876543210").await;

    let report = harness
        .resources
        .dispatcher
        .dispatch_for_user(user.id, &DispatchTrigger::all_slots())
        .await
        .unwrap();
    assert_eq!(report.sent, 3);
    assert!(report.failed.is_empty());

    let sent = harness.sender.sent();
    assert_eq!(sent.len(), 3);
    assert!(sent.iter().all(|m| m.to == "+919876543210"));
    assert!(sent[0].body.starts_with("Hey Asha!"));
    assert!(sent[0].body.contains("*Breakfast*"));
    assert!(sent[0].body.contains("*Poha*"));
    assert!(sent[0].body.contains(MESSAGE_REPLY));
    assert!(sent[2].body.contains("*Paneer Tikka*"));
    assert!(sent
        .iter()
        .all(|m| m.media_url.as_deref().unwrap().starts_with(TEST_BASE_URL)));

    let writer_payload = &harness.llm.payloads(AgentKind::MessageWriter)[0];
    assert_eq!(writer_payload["user_name"], "Asha");
    assert_eq!(writer_payload["dish_name"], "Poha");
}

#[tokio::test]
async fn test_scheduled_slots() {
    let harness = happy_harness().await;
    let user = planned_user(&harness, "Asha", "+919876543210").await;
    let dispatcher = &harness.resources.dispatcher;
    assert_eq!(dispatcher.trigger_count(), 3);

    let report = dispatcher
        .dispatch_for_user(user.id, &DispatchTrigger::scheduled(1))
        .await
        .unwrap();
    assert_eq!(report.sent, 1);
    assert!(harness.sender.sent()[0].body.contains("*Rajma Chawal*"));

    let report = dispatcher
        .dispatch_for_user(user.id, &DispatchTrigger::scheduled(5))
        .await
        .unwrap();
    assert_eq!(report.sent, 0);
    assert!(report.failed.is_empty());
}

#[tokio::test]
async fn test_last_trigger_covers_remaining_slots() {
    let mut config = test_config();
    config.schedule.times = vec![
        NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
        NaiveTime::from_hms_opt(19, 0, 0).unwrap(),
    ];
    let llm = ScriptedLlmProvider::happy_path(config.pipeline.plan_days);
    let harness = harness_with(config, llm).await;
    let user = planned_user(&harness, "Asha", "+919876543210").await;

    let report = harness
        .resources
        .dispatcher
        .dispatch_for_user(user.id, &DispatchTrigger::scheduled(1))
        .await
        .unwrap();
    assert_eq!(report.sent, 2);
    let bodies: Vec<String> = harness.sender.sent().into_iter().map(|m| m.body).collect();
    assert!(bodies[0].contains("*Lunch*"));
    assert!(bodies[1].contains("*Dinner*"));
}

#[tokio::test]
async fn test_explicit_day_label() {
    let harness = happy_harness().await;
    let user = planned_user(&harness, "Asha", "+919876543210").await;
    let dispatcher = &harness.resources.dispatcher;

    let trigger: DispatchTrigger =
        serde_json::from_value(serde_json::json!({"slot_index": 0, "day": "Day 2"})).unwrap();
    let report = dispatcher.dispatch_for_user(user.id, &trigger).await.unwrap();
    assert_eq!(report.sent, 1);
    assert!(harness.sender.sent()[0].body.contains("*Idli Sambar*"));

    let missing = DispatchTrigger {
        slot_index: None,
        day_label: Some("Day 9".into()),
    };
    let report = dispatcher.dispatch_for_user(user.id, &missing).await.unwrap();
    assert_eq!(report.sent, 0);
    assert_eq!(report.failed.len(), 1);
    assert!(report.failed[0].error.contains("Day 9"));
}

#[tokio::test]
async fn test_message_writer_failure_uses_template() {
    let harness = happy_harness().await;
    let user = planned_user(&harness, "Asha", "+919876543210").await;
    harness.llm.push(
        AgentKind::MessageWriter,
        ScriptedReply::Error(ErrorCode::ExternalServiceError),
    );

    let report = harness
        .resources
        .dispatcher
        .dispatch_for_user(user.id, &DispatchTrigger::scheduled(0))
        .await
        .unwrap();
    assert_eq!(report.sent, 1);
    let body = &harness.sender.sent()[0].body;
    assert!(body.contains("Packed with Iron, B vitamins"));
    assert!(!body.contains(MESSAGE_REPLY));
}

#[tokio::test]
async fn test_sender_failure_does_not_stop_other_users() {
    let harness = happy_harness().await;
    let failing = planned_user(&harness, "Asha", "+919876543210").await;
    planned_user(&harness, "Ravi", "+919800000001").await;
    harness.sender.fail_for("+919876543210");

    let report = harness
        .resources
        .dispatcher
        .dispatch(&DispatchTrigger::scheduled(0))
        .await
        .unwrap();
    assert_eq!(report.sent, 1);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].user_id, failing.id);
    assert_eq!(report.failed[0].slot, "Breakfast");
    assert_eq!(harness.sender.sent()[0].to, "+919800000001");
}

#[tokio::test]
async fn test_dispatch_without_plan_is_not_found() {
    let harness = happy_harness().await;
    let user = create_test_user(&harness.resources.database, "Asha", "+919876543210").await;

    let err = harness
        .resources
        .dispatcher
        .dispatch_for_user(user.id, &DispatchTrigger::all_slots())
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    let report = harness
        .resources
        .dispatcher
        .dispatch(&DispatchTrigger::all_slots())
        .await
        .unwrap();
    assert_eq!(report.sent, 0);
    assert!(report.failed.is_empty());
}
