// ABOUTME: Error types for the Nourish server, re-exported from nourish-core
// ABOUTME: AppError, ErrorCode, AppResult and extraction errors live in the core crate
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

pub use nourish_core::errors::*;
