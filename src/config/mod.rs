// ABOUTME: Configuration management module for centralized server settings and parameters
// ABOUTME: Handles environment configs and nutrition calculation parameters
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! Configuration module for Nourish
//!
//! - **Environment**: Server, agent, image, messaging, schedule and pipeline
//!   settings from environment variables
//! - **Nutrition**: BMR coefficients, activity factors, goal multipliers and
//!   macro split used by the nutrition calculator

/// Environment and server configuration
pub mod environment;
/// Nutrition calculation parameters
pub mod nutrition;

pub use environment::{
    DatabaseUrl, Environment, ImageConfig, LlmConfig, LlmProviderType, MessagingConfig,
    PipelineConfig, ScheduleConfig, ServerConfig, TwilioConfig,
};
pub use nutrition::NutritionConfig;
