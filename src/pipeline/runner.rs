// ABOUTME: Runs stage sequences for one user or the whole user base
// ABOUTME: Users run concurrently up to a configured bound; one failure never aborts the batch
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use std::time::Instant;

use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{info, instrument};
use uuid::Uuid;

use super::stages::price_list;
use super::{PipelineContext, PipelineStage, StageOutcome};
use crate::errors::{AppError, AppResult};
use crate::logging::PipelineLogger;

/// A stage that returned an error
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageFailure {
    /// Failing stage
    pub stage: PipelineStage,
    /// User (or list owner) it ran for
    pub user_id: Uuid,
    /// Error code identifier
    pub code: String,
    /// Error message
    pub error: String,
}

impl StageFailure {
    fn new(stage: PipelineStage, user_id: Uuid, error: &AppError) -> Self {
        Self {
            stage,
            user_id,
            code: format!("{:?}", error.code),
            error: error.message.clone(),
        }
    }
}

/// Everything that happened for one user
#[derive(Debug, Clone, Serialize)]
pub struct UserRunReport {
    /// User the stages ran for
    pub user_id: Uuid,
    /// Outcomes of the stages that returned
    pub outcomes: Vec<StageOutcome>,
    /// First error, after which the user's remaining stages were not run
    pub failure: Option<StageFailure>,
}

impl UserRunReport {
    /// Whether every requested stage ran without error
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        self.failure.is_none()
    }
}

/// Result of a full batch run
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    /// Per-user stage results
    pub per_user: Vec<UserRunReport>,
    /// Pricing results over all stored lists
    pub pricing: Vec<StageOutcome>,
    /// Lists whose pricing returned an error
    pub pricing_failures: Vec<StageFailure>,
}

impl BatchReport {
    /// Users whose stages all ran without error
    #[must_use]
    pub fn succeeded_users(&self) -> usize {
        self.per_user.iter().filter(|r| r.succeeded()).count()
    }

    /// Users with a failed stage
    #[must_use]
    pub fn failed_users(&self) -> usize {
        self.per_user.len() - self.succeeded_users()
    }
}

/// Drives stage sequences over a [`PipelineContext`]
#[derive(Debug, Clone)]
pub struct PipelineRunner {
    ctx: PipelineContext,
    concurrency: usize,
}

impl PipelineRunner {
    /// Runner using the context's configured concurrency
    #[must_use]
    pub fn new(ctx: PipelineContext) -> Self {
        let concurrency = ctx.config.pipeline.concurrency.max(1);
        Self { ctx, concurrency }
    }

    /// Override the number of users processed at once
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// The context stages run against
    #[must_use]
    pub const fn context(&self) -> &PipelineContext {
        &self.ctx
    }

    /// Run stages in order for one user
    ///
    /// Stops at the first error, and after a producing stage that stored
    /// nothing.
    #[instrument(skip(self, stages), fields(user_id = %user_id))]
    pub async fn run_for_user(&self, user_id: Uuid, stages: &[PipelineStage]) -> UserRunReport {
        let mut outcomes = Vec::with_capacity(stages.len());
        let mut failure = None;

        for &stage in stages {
            match self.ctx.run_stage(stage, user_id).await {
                Ok(outcome) => {
                    let halt = outcome.blocks_downstream();
                    outcomes.push(outcome);
                    if halt {
                        break;
                    }
                }
                Err(e) => {
                    failure = Some(StageFailure::new(stage, user_id, &e));
                    break;
                }
            }
        }

        UserRunReport {
            user_id,
            outcomes,
            failure,
        }
    }

    /// Run the batch stages for every user, then price every list
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` only when users or lists cannot be listed.
    pub async fn run_batch(&self) -> AppResult<BatchReport> {
        let started = Instant::now();
        let users = self.ctx.database.list_users().await?;
        info!(
            users = users.len(),
            concurrency = self.concurrency,
            "Starting batch pipeline run"
        );

        let stages = PipelineStage::batch();
        let per_user: Vec<UserRunReport> = stream::iter(users.iter().map(|u| u.id))
            .map(|user_id| self.run_for_user(user_id, &stages))
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let (pricing, pricing_failures) = self.price_all_lists().await?;
        let report = BatchReport {
            per_user,
            pricing,
            pricing_failures,
        };

        info!(
            succeeded = report.succeeded_users(),
            failed = report.failed_users(),
            priced = report.pricing.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Batch pipeline run finished"
        );
        Ok(report)
    }

    /// Price every stored shopping list
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the lists cannot be loaded.
    pub async fn price_all_lists(&self) -> AppResult<(Vec<StageOutcome>, Vec<StageFailure>)> {
        let lists = self.ctx.database.list_shopping_lists().await?;
        let stage = PipelineStage::Pricing;
        let mut outcomes = Vec::with_capacity(lists.len());
        let mut failures = Vec::new();

        for list in &lists {
            let owner = list.user_id.to_string();
            PipelineLogger::log_stage_started(stage.as_str(), &owner);
            let started = Instant::now();

            match price_list(&self.ctx, list).await {
                Ok(outcome) => {
                    match &outcome {
                        StageOutcome::Completed { detail, .. } => PipelineLogger::log_stage_completed(
                            stage.as_str(),
                            &owner,
                            started.elapsed().as_millis() as u64,
                            detail,
                        ),
                        StageOutcome::Skipped { reason, .. } => {
                            PipelineLogger::log_stage_skipped(stage.as_str(), &owner, reason);
                        }
                    }
                    outcomes.push(outcome);
                }
                Err(e) => {
                    PipelineLogger::log_stage_failed(stage.as_str(), &owner, &e.to_string());
                    failures.push(StageFailure::new(stage, list.user_id, &e));
                }
            }
        }

        Ok((outcomes, failures))
    }
}
