// ABOUTME: Shopping list persistence keyed by the source meal plan
// ABOUTME: Regenerating a list clears its pricing until the predictor runs again
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use std::collections::BTreeMap;

use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row};
use uuid::Uuid;

use super::{parse_timestamp, parse_uuid, Database};
use crate::errors::{AppError, AppResult};
use crate::models::{PricingDetails, ShoppingList};

const LIST_COLUMNS: &str =
    "id, user_id, source_meal_plan_id, categories, pricing, created_at, updated_at";

impl Database {
    pub(super) async fn migrate_shopping(&self) -> AppResult<()> {
        self.execute_ddl(
            r"
            CREATE TABLE IF NOT EXISTS shopping_lists (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                source_meal_plan_id TEXT NOT NULL UNIQUE,
                categories TEXT NOT NULL,
                pricing TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            ",
        )
        .await?;
        self.execute_ddl(
            "CREATE INDEX IF NOT EXISTS idx_shopping_lists_user ON shopping_lists(user_id)",
        )
        .await
    }

    /// Replace the shopping list for a meal plan
    ///
    /// Any previous pricing is dropped since it priced different items.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the write fails.
    pub async fn upsert_shopping_list(
        &self,
        user_id: Uuid,
        meal_plan_id: Uuid,
        categories: &BTreeMap<String, Vec<String>>,
    ) -> AppResult<ShoppingList> {
        sqlx::query(
            r"
            INSERT INTO shopping_lists (
                id, user_id, source_meal_plan_id, categories, pricing, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, NULL, $5, $5)
            ON CONFLICT(source_meal_plan_id) DO UPDATE SET
                user_id = excluded.user_id,
                categories = excluded.categories,
                pricing = NULL,
                updated_at = excluded.updated_at
            ",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(user_id.to_string())
        .bind(meal_plan_id.to_string())
        .bind(serde_json::to_string(categories)?)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to upsert shopping list: {e}")))?;

        self.get_shopping_list_by_meal_plan(meal_plan_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Shopping list for meal plan {meal_plan_id}")))
    }

    /// Attach predicted prices to a shopping list
    ///
    /// # Errors
    ///
    /// Returns `ResourceNotFound` if the list does not exist, or `DatabaseError`.
    pub async fn set_pricing(&self, list_id: Uuid, pricing: &PricingDetails) -> AppResult<()> {
        let result = sqlx::query(
            r"
            UPDATE shopping_lists SET pricing = $2, updated_at = $3 WHERE id = $1
            ",
        )
        .bind(list_id.to_string())
        .bind(serde_json::to_string(pricing)?)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to store pricing: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("Shopping list {list_id}")));
        }
        Ok(())
    }

    /// Shopping list extracted from a given meal plan
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn get_shopping_list_by_meal_plan(
        &self,
        meal_plan_id: Uuid,
    ) -> AppResult<Option<ShoppingList>> {
        let row = sqlx::query(&format!(
            "SELECT {LIST_COLUMNS} FROM shopping_lists WHERE source_meal_plan_id = $1"
        ))
        .bind(meal_plan_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to get shopping list: {e}")))?;

        row.map(|r| row_to_list(&r)).transpose()
    }

    /// Most recently updated shopping list of a user
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn get_shopping_list_for_user(&self, user_id: Uuid) -> AppResult<Option<ShoppingList>> {
        let row = sqlx::query(&format!(
            "SELECT {LIST_COLUMNS} FROM shopping_lists WHERE user_id = $1 \
             ORDER BY updated_at DESC LIMIT 1"
        ))
        .bind(user_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to get shopping list: {e}")))?;

        row.map(|r| row_to_list(&r)).transpose()
    }

    /// All shopping lists, oldest first
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn list_shopping_lists(&self) -> AppResult<Vec<ShoppingList>> {
        let rows = sqlx::query(&format!(
            "SELECT {LIST_COLUMNS} FROM shopping_lists ORDER BY created_at ASC, id ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to list shopping lists: {e}")))?;

        rows.iter().map(row_to_list).collect()
    }
}

fn row_to_list(row: &SqliteRow) -> AppResult<ShoppingList> {
    let id: String = row.get("id");
    let user_id: String = row.get("user_id");
    let plan_id: String = row.get("source_meal_plan_id");
    let categories: String = row.get("categories");
    let pricing: Option<String> = row.get("pricing");
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");

    Ok(ShoppingList {
        id: parse_uuid(&id)?,
        user_id: parse_uuid(&user_id)?,
        source_meal_plan_id: parse_uuid(&plan_id)?,
        categories: serde_json::from_str(&categories)?,
        pricing: pricing.as_deref().map(serde_json::from_str).transpose()?,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}
