// ABOUTME: Main library entry point for the Nourish meal-planning server
// ABOUTME: Nutrition analysis, meal plans, recipes, shopping lists, pricing and meal reminders
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

#![deny(unsafe_code)]

//! # Nourish Server
//!
//! A meal-planning pipeline driven by hosted language models. For each user
//! profile it computes daily nutrition targets, asks agents for a multi-day
//! meal plan, attaches dish images and recipes, derives a categorized
//! shopping list with estimated prices, and sends meal reminders over
//! `WhatsApp` on a daily schedule.
//!
//! ## Architecture
//!
//! - **Intelligence**: deterministic BMR/TDEE and macro calculator
//! - **LLM / Agents**: provider abstraction and the six named agents
//! - **Pipeline**: per-user stages over the database
//! - **Notifications**: reminder composition, dispatch and scheduling
//! - **Routes**: JSON HTTP API over the same operations
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use nourish_server::config::ServerConfig;
//! use nourish_server::errors::AppResult;
//!
//! #[tokio::main]
//! async fn main() -> AppResult<()> {
//!     let config = ServerConfig::from_env()?;
//!     println!("Nourish configured with port: HTTP={}", config.http_port);
//!     Ok(())
//! }
//! ```

/// Named agents and their invocation runner
pub mod agents;

/// Environment configuration and calculator constants
pub mod config;

/// Application constants organized by domain
pub mod constants;

/// `SQLite` persistence for users, reports, plans, images and shopping lists
pub mod database;

/// Unified error handling
pub mod errors;

/// Image generation and outbound messaging clients
pub mod external;

/// Deterministic nutrition calculations
pub mod intelligence;

/// Language-model providers
pub mod llm;

/// Structured logging setup
pub mod logging;

/// HTTP middleware
pub mod middleware;

/// Domain models
pub mod models;

/// Meal reminder notifications
pub mod notifications;

/// Per-user pipeline stages and batch runner
pub mod pipeline;

/// Shared server resources
pub mod resources;

/// HTTP routes
pub mod routes;
