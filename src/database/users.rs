// ABOUTME: User profile database operations keyed by phone number
// ABOUTME: Upsert keeps the user id stable across profile updates
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row};
use uuid::Uuid;

use super::{parse_timestamp, parse_uuid, Database};
use crate::errors::{AppError, AppResult};
use crate::models::{ProfileSubmission, UserProfile};

const USER_COLUMNS: &str = "id, name, phone, age, weight_kg, height_cm, gender, activity_level, goal, diet_type, \
     allergies, dislikes, likes, cuisine, budget_inr, meals_per_day, created_at, updated_at";

impl Database {
    pub(super) async fn migrate_users(&self) -> AppResult<()> {
        self.execute_ddl(
            r"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                phone TEXT NOT NULL UNIQUE,
                age INTEGER NOT NULL,
                weight_kg REAL NOT NULL,
                height_cm REAL NOT NULL,
                gender TEXT NOT NULL,
                activity_level TEXT NOT NULL,
                goal TEXT NOT NULL,
                diet_type TEXT NOT NULL DEFAULT '',
                allergies TEXT NOT NULL DEFAULT '[]',
                dislikes TEXT NOT NULL DEFAULT '[]',
                likes TEXT NOT NULL DEFAULT '[]',
                cuisine TEXT NOT NULL DEFAULT '',
                budget_inr REAL,
                meals_per_day INTEGER NOT NULL DEFAULT 3,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            ",
        )
        .await
    }

    /// Insert a profile, or update the existing one with the same phone
    ///
    /// The phone must already be normalized; the returned profile keeps the
    /// id and `created_at` of any previous version.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the write fails.
    pub async fn upsert_user_by_phone(
        &self,
        submission: &ProfileSubmission,
    ) -> AppResult<UserProfile> {
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r"
            INSERT INTO users (
                id, name, phone, age, weight_kg, height_cm, gender, activity_level, goal,
                diet_type, allergies, dislikes, likes, cuisine, budget_inr, meals_per_day,
                created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $17)
            ON CONFLICT(phone) DO UPDATE SET
                name = excluded.name,
                age = excluded.age,
                weight_kg = excluded.weight_kg,
                height_cm = excluded.height_cm,
                gender = excluded.gender,
                activity_level = excluded.activity_level,
                goal = excluded.goal,
                diet_type = excluded.diet_type,
                allergies = excluded.allergies,
                dislikes = excluded.dislikes,
                likes = excluded.likes,
                cuisine = excluded.cuisine,
                budget_inr = excluded.budget_inr,
                meals_per_day = excluded.meals_per_day,
                updated_at = excluded.updated_at
            ",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(submission.name.trim())
        .bind(&submission.phone)
        .bind(i64::from(submission.age))
        .bind(submission.weight_kg)
        .bind(submission.height_cm)
        .bind(&submission.gender)
        .bind(&submission.activity_level)
        .bind(&submission.goal)
        .bind(&submission.diet_type)
        .bind(serde_json::to_string(&submission.allergies)?)
        .bind(serde_json::to_string(&submission.dislikes)?)
        .bind(serde_json::to_string(&submission.likes)?)
        .bind(&submission.cuisine)
        .bind(submission.budget_inr)
        .bind(i64::from(submission.meals_per_day))
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to upsert user: {e}")))?;

        self.get_user_by_phone(&submission.phone)
            .await?
            .ok_or_else(|| AppError::not_found(format!("User with phone {}", submission.phone)))
    }

    /// Get a user by id
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn get_user(&self, id: Uuid) -> AppResult<Option<UserProfile>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to get user: {e}")))?;

        row.map(|r| row_to_user(&r)).transpose()
    }

    /// Get a user by normalized phone number
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn get_user_by_phone(&self, phone: &str) -> AppResult<Option<UserProfile>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE phone = $1"))
            .bind(phone)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to get user by phone: {e}")))?;

        row.map(|r| row_to_user(&r)).transpose()
    }

    /// All users, oldest first
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn list_users(&self) -> AppResult<Vec<UserProfile>> {
        let rows = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at ASC, id ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to list users: {e}")))?;

        rows.iter().map(row_to_user).collect()
    }
}

fn row_to_user(row: &SqliteRow) -> AppResult<UserProfile> {
    let id: String = row.get("id");
    let allergies: String = row.get("allergies");
    let dislikes: String = row.get("dislikes");
    let likes: String = row.get("likes");
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");
    let age: i64 = row.get("age");
    let meals_per_day: i64 = row.get("meals_per_day");

    Ok(UserProfile {
        id: parse_uuid(&id)?,
        name: row.get("name"),
        phone: row.get("phone"),
        age: age as u32,
        weight_kg: row.get("weight_kg"),
        height_cm: row.get("height_cm"),
        gender: row.get("gender"),
        activity_level: row.get("activity_level"),
        goal: row.get("goal"),
        diet_type: row.get("diet_type"),
        allergies: serde_json::from_str(&allergies)?,
        dislikes: serde_json::from_str(&dislikes)?,
        likes: serde_json::from_str(&likes)?,
        cuisine: row.get("cuisine"),
        budget_inr: row.get("budget_inr"),
        meals_per_day: meals_per_day as u8,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}
