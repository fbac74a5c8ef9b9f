// ABOUTME: Nutrition report persistence, one current report per user
// ABOUTME: Stores calculator targets and the agent report as JSON documents
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use chrono::Utc;
use serde_json::Value;
use sqlx::{sqlite::SqliteRow, Row};
use uuid::Uuid;

use super::{parse_timestamp, parse_uuid, Database};
use crate::errors::{AppError, AppResult};
use crate::models::{NutritionReport, NutritionTargets};

impl Database {
    pub(super) async fn migrate_nutrition(&self) -> AppResult<()> {
        self.execute_ddl(
            r"
            CREATE TABLE IF NOT EXISTS nutrition_reports (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
                targets TEXT NOT NULL,
                report TEXT NOT NULL,
                generated_at TEXT NOT NULL
            )
            ",
        )
        .await
    }

    /// Replace the user's nutrition report
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the write fails.
    pub async fn upsert_nutrition_report(
        &self,
        user_id: Uuid,
        targets: &NutritionTargets,
        report: &Value,
    ) -> AppResult<NutritionReport> {
        sqlx::query(
            r"
            INSERT INTO nutrition_reports (id, user_id, targets, report, generated_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT(user_id) DO UPDATE SET
                targets = excluded.targets,
                report = excluded.report,
                generated_at = excluded.generated_at
            ",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(user_id.to_string())
        .bind(serde_json::to_string(targets)?)
        .bind(serde_json::to_string(report)?)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to upsert nutrition report: {e}")))?;

        self.get_nutrition_report(user_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Nutrition report for user {user_id}")))
    }

    /// Current nutrition report for a user
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn get_nutrition_report(&self, user_id: Uuid) -> AppResult<Option<NutritionReport>> {
        let row = sqlx::query(
            r"
            SELECT id, user_id, targets, report, generated_at
            FROM nutrition_reports WHERE user_id = $1
            ",
        )
        .bind(user_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to get nutrition report: {e}")))?;

        row.map(|r| row_to_report(&r)).transpose()
    }
}

fn row_to_report(row: &SqliteRow) -> AppResult<NutritionReport> {
    let id: String = row.get("id");
    let user_id: String = row.get("user_id");
    let targets: String = row.get("targets");
    let report: String = row.get("report");
    let generated_at: String = row.get("generated_at");

    Ok(NutritionReport {
        id: parse_uuid(&id)?,
        user_id: parse_uuid(&user_id)?,
        targets: serde_json::from_str(&targets)?,
        report: serde_json::from_str(&report)?,
        generated_at: parse_timestamp(&generated_at)?,
    })
}
