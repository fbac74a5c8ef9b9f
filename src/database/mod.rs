// ABOUTME: SQLite document store for profiles, reports, meal plans, images and shopping lists
// ABOUTME: Idempotent migrations and shared row-decoding helpers
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! # Database Management
//!
//! Every pipeline artifact is a JSON document in a TEXT column, keyed so that
//! regeneration replaces the previous document:
//!
//! | Table | Key |
//! |-------|-----|
//! | `users` | `phone` |
//! | `nutrition_reports` | `user_id` |
//! | `meal_plans` | `user_id` |
//! | `images` | `id` |
//! | `shopping_lists` | `source_meal_plan_id` |
//!
//! Writes are single `INSERT ... ON CONFLICT DO UPDATE` statements, so the
//! last writer wins.

mod images;
mod meal_plans;
mod nutrition;
mod shopping;
mod users;

pub use images::StoredImage;

use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::DatabaseUrl;
use crate::errors::{AppError, AppResult};

/// Database handle shared by the pipeline, dispatcher and HTTP routes
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open a database and run migrations
    ///
    /// File databases are created on first use. `:memory:` databases use a
    /// single connection so every query sees the same data.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the connection or a migration fails.
    pub async fn new(database_url: &str) -> AppResult<Self> {
        let url = DatabaseUrl::parse_url(database_url);

        let pool = match &url {
            DatabaseUrl::Memory => SqlitePoolOptions::new()
                .max_connections(1)
                .connect("sqlite::memory:")
                .await
                .map_err(|e| AppError::database(format!("Failed to open in-memory database: {e}")))?,
            DatabaseUrl::SQLite { path } => {
                ensure_parent_dir(path).await?;
                let options = SqliteConnectOptions::from_str(&format!(
                    "{}?mode=rwc",
                    url.to_connection_string()
                ))
                .map_err(|e| AppError::database(format!("Invalid database URL: {e}")))?;
                SqlitePoolOptions::new()
                    .connect_with(options)
                    .await
                    .map_err(|e| {
                        AppError::database(format!("Failed to open database {}: {e}", path.display()))
                    })?
            }
        };

        let db = Self { pool };
        db.migrate().await?;
        info!(database = %url, "Database ready");
        Ok(db)
    }

    /// Get a reference to the database pool for advanced operations
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create all tables and indexes
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if a statement fails.
    pub async fn migrate(&self) -> AppResult<()> {
        self.migrate_users().await?;
        self.migrate_nutrition().await?;
        self.migrate_meal_plans().await?;
        self.migrate_images().await?;
        self.migrate_shopping().await?;
        debug!("Database migrations applied");
        Ok(())
    }

    /// Round-trip a trivial query to confirm the pool is usable
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn health_check(&self) -> AppResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Health check failed: {e}")))?;
        Ok(())
    }

    async fn execute_ddl(&self, statement: &str) -> AppResult<()> {
        sqlx::query(statement)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Migration failed: {e}")))?;
        Ok(())
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("connections", &self.pool.size())
            .finish_non_exhaustive()
    }
}

async fn ensure_parent_dir(path: &Path) -> AppResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            AppError::database(format!(
                "Failed to create database directory {}: {e}",
                parent.display()
            ))
        })?;
    }
    Ok(())
}

pub(crate) fn parse_uuid(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|e| AppError::internal(format!("Invalid UUID: {e}")))
}

pub(crate) fn parse_timestamp(raw: &str) -> AppResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| AppError::internal(format!("Invalid timestamp: {e}")))
}
