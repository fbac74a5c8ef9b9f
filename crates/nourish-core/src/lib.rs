// ABOUTME: Core types and constants for the Nourish meal-planning pipeline
// ABOUTME: Foundation crate with error handling, domain models, and constants
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

#![deny(unsafe_code)]

//! # Nourish Core
//!
//! Foundation crate providing shared types and constants for the Nourish
//! meal-planning pipeline. This crate is designed to change infrequently,
//! enabling incremental compilation benefits in the workspace.
//!
//! ## Modules
//!
//! - **errors**: Unified error handling with `AppError`, `ErrorCode`, and extraction errors
//! - **constants**: Application-wide constants organized by domain
//! - **models**: Profiles, nutrition reports, meal plans, shopping lists and pricing

/// Unified error handling system with standard error codes and HTTP responses
pub mod errors;

/// Application constants organized by domain
pub mod constants;

/// Core data models (profile, nutrition, meal plan, shopping, pricing)
pub mod models;
