// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org
// ABOUTME: Output formatting helpers for nourish-cli
// ABOUTME: Every command prints one pretty JSON document to stdout

use nourish_server::errors::{AppError, AppResult};
use serde::Serialize;

/// Print a value as pretty JSON
pub fn print_json<T: Serialize>(value: &T) -> AppResult<()> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|e| AppError::serialization(format!("Failed to render output: {e}")))?;
    println!("{rendered}");
    Ok(())
}
