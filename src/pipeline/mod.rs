// ABOUTME: Meal planning pipeline: ordered stages over an explicit context
// ABOUTME: Nutrition, meal plan, images, recipes, shopping list and pricing
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! # Pipeline
//!
//! Each stage reads what earlier stages stored, invokes one agent (or the
//! image generator) and writes its own document back:
//!
//! ```text
//! profile ─► nutrition ─► meal_plan ─┬─► images
//!                                    ├─► recipes
//!                                    └─► shopping_list ─► pricing
//! ```
//!
//! Stages never share in-memory state; the [`PipelineContext`] only carries
//! handles to the database and collaborators.

mod runner;
mod stages;

pub use runner::{BatchReport, PipelineRunner, StageFailure, UserRunReport};
pub use stages::{
    price_list, run_images, run_meal_plan, run_nutrition, run_pricing, run_recipes,
    run_shopping_list,
};

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::agents::AgentRunner;
use crate::config::ServerConfig;
use crate::database::Database;
use crate::errors::{AppError, AppResult};
use crate::external::{ImageGenerator, ImageHost};
use crate::logging::PipelineLogger;

/// A pipeline step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Calculator plus Nutrition Analyst
    Nutrition,
    /// Meal Planner
    MealPlan,
    /// Dish images
    Images,
    /// Recipe Generator per dish
    Recipes,
    /// Shopping List Generator
    ShoppingList,
    /// Price Predictor
    Pricing,
}

impl PipelineStage {
    /// All stages in dependency order
    #[must_use]
    pub const fn all() -> [Self; 6] {
        [
            Self::Nutrition,
            Self::MealPlan,
            Self::Images,
            Self::Recipes,
            Self::ShoppingList,
            Self::Pricing,
        ]
    }

    /// Stages run by the batch job for each user
    #[must_use]
    pub const fn batch() -> [Self; 4] {
        [Self::MealPlan, Self::Images, Self::Recipes, Self::ShoppingList]
    }

    /// Stable identifier
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Nutrition => "nutrition",
            Self::MealPlan => "meal_plan",
            Self::Images => "images",
            Self::Recipes => "recipes",
            Self::ShoppingList => "shopping_list",
            Self::Pricing => "pricing",
        }
    }

    /// Parse an identifier, accepting dashes for underscores
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for an unknown stage name.
    pub fn parse(raw: &str) -> AppResult<Self> {
        let normalized = raw.trim().to_lowercase().replace('-', "_");
        Self::all()
            .into_iter()
            .find(|stage| stage.as_str() == normalized)
            .ok_or_else(|| {
                AppError::invalid_input(format!(
                    "Unknown pipeline stage '{raw}'. Expected one of: {}",
                    Self::all().map(Self::as_str).join(", ")
                ))
            })
    }

    /// Whether later stages read this stage's output
    #[must_use]
    pub const fn is_producer(self) -> bool {
        matches!(self, Self::MealPlan | Self::ShoppingList)
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one stage for one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StageOutcome {
    /// The stage stored its output
    Completed {
        /// Stage that ran
        stage: PipelineStage,
        /// User (or list owner) it ran for
        user_id: Uuid,
        /// What was produced
        detail: String,
    },
    /// The stage had nothing usable to store
    Skipped {
        /// Stage that ran
        stage: PipelineStage,
        /// User (or list owner) it ran for
        user_id: Uuid,
        /// Why nothing was stored
        reason: String,
    },
}

impl StageOutcome {
    /// Stage this outcome belongs to
    #[must_use]
    pub const fn stage(&self) -> PipelineStage {
        match self {
            Self::Completed { stage, .. } | Self::Skipped { stage, .. } => *stage,
        }
    }

    /// Whether the stage was skipped
    #[must_use]
    pub const fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }

    /// Whether downstream stages have nothing to read after this outcome
    #[must_use]
    pub const fn blocks_downstream(&self) -> bool {
        self.is_skipped() && self.stage().is_producer()
    }
}

/// Handles every stage needs
#[derive(Clone)]
pub struct PipelineContext {
    /// Document store
    pub database: Arc<Database>,
    /// Agent invocation wrapper
    pub agents: Arc<AgentRunner>,
    /// Dish image generator
    pub image_generator: Arc<dyn ImageGenerator>,
    /// Public image links
    pub image_host: Arc<dyn ImageHost>,
    /// Server configuration
    pub config: Arc<ServerConfig>,
}

impl PipelineContext {
    /// Run one stage for a user, logging its outcome
    ///
    /// # Errors
    ///
    /// Returns the stage's error; `ResourceNotFound` when an input document
    /// is missing.
    pub async fn run_stage(&self, stage: PipelineStage, user_id: Uuid) -> AppResult<StageOutcome> {
        let user = user_id.to_string();
        PipelineLogger::log_stage_started(stage.as_str(), &user);
        let started = Instant::now();

        let result = match stage {
            PipelineStage::Nutrition => run_nutrition(self, user_id).await,
            PipelineStage::MealPlan => run_meal_plan(self, user_id).await,
            PipelineStage::Images => run_images(self, user_id).await,
            PipelineStage::Recipes => run_recipes(self, user_id).await,
            PipelineStage::ShoppingList => run_shopping_list(self, user_id).await,
            PipelineStage::Pricing => run_pricing(self, user_id).await,
        };

        match &result {
            Ok(StageOutcome::Completed { detail, .. }) => PipelineLogger::log_stage_completed(
                stage.as_str(),
                &user,
                started.elapsed().as_millis() as u64,
                detail,
            ),
            Ok(StageOutcome::Skipped { reason, .. }) => {
                PipelineLogger::log_stage_skipped(stage.as_str(), &user, reason);
            }
            Err(e) => PipelineLogger::log_stage_failed(stage.as_str(), &user, &e.to_string()),
        }
        result
    }
}

impl fmt::Debug for PipelineContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineContext")
            .field("database", &self.database)
            .field("agents", &self.agents)
            .finish_non_exhaustive()
    }
}
