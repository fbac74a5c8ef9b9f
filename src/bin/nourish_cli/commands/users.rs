// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org
// ABOUTME: User commands for inspecting stored profiles
// ABOUTME: Lists id, name, phone and goal for every user

use nourish_server::{database::Database, errors::AppResult};
use serde_json::json;

use crate::helpers::display::print_json;

/// List stored users
pub async fn list(database: &Database) -> AppResult<()> {
    let users = database.list_users().await?;
    let rows: Vec<_> = users
        .iter()
        .map(|u| {
            json!({
                "id": u.id,
                "name": u.name,
                "phone": u.phone,
                "goal": u.goal,
                "created_at": u.created_at,
            })
        })
        .collect();
    print_json(&rows)
}
