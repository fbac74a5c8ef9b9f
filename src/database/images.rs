// ABOUTME: Blob store for generated dish images
// ABOUTME: Images are immutable once written and served back by id
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use chrono::{DateTime, Utc};
use sqlx::{Row, SqliteConnection};
use uuid::Uuid;

use super::{parse_timestamp, parse_uuid, Database};
use crate::errors::{AppError, AppResult};

/// An image blob with its metadata
#[derive(Debug, Clone)]
pub struct StoredImage {
    /// Blob identifier
    pub id: Uuid,
    /// Image key (`{day}_{dish}`)
    pub key: String,
    /// MIME type
    pub content_type: String,
    /// Raw bytes
    pub bytes: Vec<u8>,
    /// Upload time
    pub created_at: DateTime<Utc>,
}

impl Database {
    pub(super) async fn migrate_images(&self) -> AppResult<()> {
        self.execute_ddl(
            r"
            CREATE TABLE IF NOT EXISTS images (
                id TEXT PRIMARY KEY,
                key TEXT NOT NULL,
                content_type TEXT NOT NULL,
                bytes BLOB NOT NULL,
                created_at TEXT NOT NULL
            )
            ",
        )
        .await?;
        self.execute_ddl("CREATE INDEX IF NOT EXISTS idx_images_key ON images(key)")
            .await
    }

    /// Store an image and return its blob id
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the write fails.
    pub async fn store_image(&self, key: &str, content_type: &str, bytes: &[u8]) -> AppResult<Uuid> {
        let id = Uuid::new_v4();
        sqlx::query(
            r"
            INSERT INTO images (id, key, content_type, bytes, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ",
        )
        .bind(id.to_string())
        .bind(key)
        .bind(content_type)
        .bind(bytes)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to store image: {e}")))?;

        Ok(id)
    }

    /// Fetch an image by blob id
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn get_image(&self, id: Uuid) -> AppResult<Option<StoredImage>> {
        let row = sqlx::query(
            r"
            SELECT id, key, content_type, bytes, created_at FROM images WHERE id = $1
            ",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to get image: {e}")))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let id: String = row.get("id");
        let created_at: String = row.get("created_at");
        Ok(Some(StoredImage {
            id: parse_uuid(&id)?,
            key: row.get("key"),
            content_type: row.get("content_type"),
            bytes: row.get("bytes"),
            created_at: parse_timestamp(&created_at)?,
        }))
    }

    /// Delete image blobs by id, returning how many rows went away
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if a delete fails.
    pub async fn delete_images(&self, ids: &[Uuid]) -> AppResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| AppError::database(format!("Failed to acquire connection: {e}")))?;
        delete_image_rows(&mut conn, ids).await
    }

    /// Number of stored images
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn count_images(&self) -> AppResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM images")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to count images: {e}")))?;
        Ok(count as u64)
    }
}

pub(super) async fn delete_image_rows(conn: &mut SqliteConnection, ids: &[Uuid]) -> AppResult<u64> {
    let mut deleted = 0;
    for id in ids {
        deleted += sqlx::query("DELETE FROM images WHERE id = $1")
            .bind(id.to_string())
            .execute(&mut *conn)
            .await
            .map_err(|e| AppError::database(format!("Failed to delete image {id}: {e}")))?
            .rows_affected();
    }
    Ok(deleted)
}
