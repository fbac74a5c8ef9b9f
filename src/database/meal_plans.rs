// ABOUTME: Meal plan persistence, one current plan per user
// ABOUTME: Regeneration replaces the days document; image and recipe attachment updates it in place
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use std::collections::HashSet;

use chrono::Utc;
use serde_json::{Map, Value};
use sqlx::{sqlite::SqliteRow, Row, SqliteConnection};
use tracing::debug;
use uuid::Uuid;

use super::images::delete_image_rows;
use super::{parse_timestamp, parse_uuid, Database};
use crate::errors::{AppError, AppResult};
use crate::models::MealPlan;

const PLAN_COLUMNS: &str = "id, user_id, nutrition_report_id, days, generated_at, updated_at";

impl Database {
    pub(super) async fn migrate_meal_plans(&self) -> AppResult<()> {
        self.execute_ddl(
            r"
            CREATE TABLE IF NOT EXISTS meal_plans (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
                nutrition_report_id TEXT NOT NULL,
                days TEXT NOT NULL,
                generated_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            ",
        )
        .await
    }

    /// Replace the user's meal plan, keeping the plan id stable
    ///
    /// Images referenced by the old days and not by the new ones are deleted
    /// in the same transaction.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the write fails.
    pub async fn upsert_meal_plan(
        &self,
        user_id: Uuid,
        nutrition_report_id: Uuid,
        days: &Map<String, Value>,
    ) -> AppResult<MealPlan> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::database(format!("Failed to begin transaction: {e}")))?;

        let previous: Option<String> =
            sqlx::query_scalar("SELECT days FROM meal_plans WHERE user_id = $1")
                .bind(user_id.to_string())
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| AppError::database(format!("Failed to read meal plan: {e}")))?;

        sqlx::query(
            r"
            INSERT INTO meal_plans (id, user_id, nutrition_report_id, days, generated_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            ON CONFLICT(user_id) DO UPDATE SET
                nutrition_report_id = excluded.nutrition_report_id,
                days = excluded.days,
                generated_at = excluded.generated_at,
                updated_at = excluded.updated_at
            ",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(user_id.to_string())
        .bind(nutrition_report_id.to_string())
        .bind(serde_json::to_string(days)?)
        .bind(&now)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::database(format!("Failed to upsert meal plan: {e}")))?;

        release_replaced_images(&mut *tx, previous.as_deref(), days).await?;
        tx.commit()
            .await
            .map_err(|e| AppError::database(format!("Failed to commit meal plan: {e}")))?;

        self.get_meal_plan_by_user(user_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Meal plan for user {user_id}")))
    }

    /// Current meal plan for a user
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn get_meal_plan_by_user(&self, user_id: Uuid) -> AppResult<Option<MealPlan>> {
        let row = sqlx::query(&format!(
            "SELECT {PLAN_COLUMNS} FROM meal_plans WHERE user_id = $1"
        ))
        .bind(user_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to get meal plan: {e}")))?;

        row.map(|r| row_to_meal_plan(&r)).transpose()
    }

    /// Meal plan by id
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn get_meal_plan(&self, id: Uuid) -> AppResult<Option<MealPlan>> {
        let row = sqlx::query(&format!("SELECT {PLAN_COLUMNS} FROM meal_plans WHERE id = $1"))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to get meal plan: {e}")))?;

        row.map(|r| row_to_meal_plan(&r)).transpose()
    }

    /// Overwrite the days document of an existing plan
    ///
    /// `generated_at` is left unchanged so the reminder rotation keeps its anchor.
    /// Images dropped from the document are deleted with it.
    ///
    /// # Errors
    ///
    /// Returns `ResourceNotFound` if no plan has this id, or `DatabaseError`.
    pub async fn update_meal_plan_days(&self, id: Uuid, days: &Map<String, Value>) -> AppResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::database(format!("Failed to begin transaction: {e}")))?;

        let previous: Option<String> = sqlx::query_scalar("SELECT days FROM meal_plans WHERE id = $1")
            .bind(id.to_string())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| AppError::database(format!("Failed to read meal plan: {e}")))?;
        if previous.is_none() {
            return Err(AppError::not_found(format!("Meal plan {id}")));
        }

        sqlx::query(
            r"
            UPDATE meal_plans SET days = $2, updated_at = $3 WHERE id = $1
            ",
        )
        .bind(id.to_string())
        .bind(serde_json::to_string(days)?)
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::database(format!("Failed to update meal plan: {e}")))?;

        release_replaced_images(&mut *tx, previous.as_deref(), days).await?;
        tx.commit()
            .await
            .map_err(|e| AppError::database(format!("Failed to commit meal plan: {e}")))
    }

    /// All meal plans, oldest first
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn list_meal_plans(&self) -> AppResult<Vec<MealPlan>> {
        let rows = sqlx::query(&format!(
            "SELECT {PLAN_COLUMNS} FROM meal_plans ORDER BY generated_at ASC, id ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to list meal plans: {e}")))?;

        rows.iter().map(row_to_meal_plan).collect()
    }
}

/// Delete images the previous days referenced that the new days no longer do
async fn release_replaced_images(
    conn: &mut SqliteConnection,
    previous: Option<&str>,
    days: &Map<String, Value>,
) -> AppResult<()> {
    let Some(previous) = previous else {
        return Ok(());
    };
    let old_days: Map<String, Value> = serde_json::from_str(previous)?;
    let kept: HashSet<Uuid> = MealPlan::image_blob_ids(days).into_iter().collect();
    let stale: Vec<Uuid> = MealPlan::image_blob_ids(&old_days)
        .into_iter()
        .filter(|id| !kept.contains(id))
        .collect();
    if stale.is_empty() {
        return Ok(());
    }

    let deleted = delete_image_rows(conn, &stale).await?;
    debug!(deleted, "Released images no longer referenced by the meal plan");
    Ok(())
}

fn row_to_meal_plan(row: &SqliteRow) -> AppResult<MealPlan> {
    let id: String = row.get("id");
    let user_id: String = row.get("user_id");
    let report_id: String = row.get("nutrition_report_id");
    let days: String = row.get("days");
    let generated_at: String = row.get("generated_at");
    let updated_at: String = row.get("updated_at");

    Ok(MealPlan {
        id: parse_uuid(&id)?,
        user_id: parse_uuid(&user_id)?,
        nutrition_report_id: parse_uuid(&report_id)?,
        days: serde_json::from_str(&days)?,
        generated_at: parse_timestamp(&generated_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}
