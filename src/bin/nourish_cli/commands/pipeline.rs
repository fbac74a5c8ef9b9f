// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org
// ABOUTME: Pipeline commands: batch run, single stage and pricing
// ABOUTME: Results are printed as JSON reports

use nourish_server::{
    errors::AppResult,
    pipeline::{PipelineStage, StageFailure},
    resources::ServerResources,
};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::helpers::display::print_json;

/// Run the batch stages for every user, or for one user
pub async fn run(resources: &ServerResources, user_id: Option<Uuid>) -> AppResult<()> {
    if let Some(user_id) = user_id {
        let report = resources
            .pipeline
            .run_for_user(user_id, &PipelineStage::batch())
            .await;
        return print_json(&report);
    }

    let report = resources.pipeline.run_batch().await?;
    info!(
        succeeded = report.succeeded_users(),
        failed = report.failed_users(),
        "Batch finished"
    );
    print_json(&report)
}

/// Run one named stage for one user
pub async fn stage(resources: &ServerResources, stage: &str, user_id: Uuid) -> AppResult<()> {
    let stage = PipelineStage::parse(stage)?;
    let outcome = resources
        .pipeline_context()
        .run_stage(stage, user_id)
        .await?;
    print_json(&outcome)
}

/// Price every stored shopping list
pub async fn price_all(resources: &ServerResources) -> AppResult<()> {
    let (outcomes, failures): (_, Vec<StageFailure>) = resources.pipeline.price_all_lists().await?;
    print_json(&json!({
        "outcomes": outcomes,
        "failures": failures,
    }))
}
