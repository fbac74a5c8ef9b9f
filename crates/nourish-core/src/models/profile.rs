// ABOUTME: User profile model and the validated profile submission payload
// ABOUTME: One profile per phone number; categorical fields are kept exactly as submitted
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::profile::{
    DEFAULT_MEALS_PER_DAY, MAX_AGE, MAX_HEIGHT_CM, MAX_MEALS_PER_DAY, MAX_WEIGHT_KG, MIN_AGE,
    MIN_HEIGHT_CM, MIN_MEALS_PER_DAY, MIN_WEIGHT_KG,
};
use crate::errors::{AppError, AppResult};

const fn default_meals_per_day() -> u8 {
    DEFAULT_MEALS_PER_DAY
}

/// A registered user and the preferences that drive plan generation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    /// Stable identifier, unchanged across profile updates
    pub id: Uuid,
    /// Display name
    pub name: String,
    /// Phone number in E.164 form, unique per user
    pub phone: String,
    /// Age in years
    pub age: u32,
    /// Body weight in kilograms
    pub weight_kg: f64,
    /// Height in centimeters
    pub height_cm: f64,
    /// Gender descriptor as submitted
    pub gender: String,
    /// Activity descriptor as submitted (e.g. "Moderately active")
    pub activity_level: String,
    /// Goal descriptor as submitted (e.g. "Weight loss")
    pub goal: String,
    /// Diet descriptor as submitted (e.g. "Vegetarian")
    pub diet_type: String,
    /// Ingredients that must never appear
    #[serde(default)]
    pub allergies: Vec<String>,
    /// Ingredients to avoid
    #[serde(default)]
    pub dislikes: Vec<String>,
    /// Preferred foods
    #[serde(default)]
    pub likes: Vec<String>,
    /// Preferred cuisine
    #[serde(default)]
    pub cuisine: String,
    /// Weekly food budget in INR
    #[serde(default)]
    pub budget_inr: Option<f64>,
    /// Meals per day the plan must contain
    #[serde(default = "default_meals_per_day")]
    pub meals_per_day: u8,
    /// When the profile was first created
    pub created_at: DateTime<Utc>,
    /// When the profile was last updated
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    /// Agent-facing view of the profile with ids rendered as plain strings
    #[must_use]
    pub fn to_agent_payload(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id.to_string(),
            "name": self.name,
            "age": self.age,
            "weight": self.weight_kg,
            "height": self.height_cm,
            "gender": self.gender,
            "activity": self.activity_level,
            "goal": self.goal,
            "diet": self.diet_type,
            "allergies": self.allergies,
            "dislikes": self.dislikes,
            "likes": self.likes,
            "cuisine": self.cuisine,
            "budget": self.budget_inr,
            "meals_per_day": self.meals_per_day,
        })
    }
}

/// Profile create/update payload, keyed by phone number
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileSubmission {
    /// Display name
    pub name: String,
    /// Phone number (normalized before storage)
    pub phone: String,
    /// Age in years
    pub age: u32,
    /// Body weight in kilograms
    pub weight_kg: f64,
    /// Height in centimeters
    pub height_cm: f64,
    /// Gender descriptor
    pub gender: String,
    /// Activity descriptor
    pub activity_level: String,
    /// Goal descriptor
    pub goal: String,
    /// Diet descriptor
    #[serde(default)]
    pub diet_type: String,
    /// Allergies
    #[serde(default)]
    pub allergies: Vec<String>,
    /// Dislikes
    #[serde(default)]
    pub dislikes: Vec<String>,
    /// Likes
    #[serde(default)]
    pub likes: Vec<String>,
    /// Preferred cuisine
    #[serde(default)]
    pub cuisine: String,
    /// Weekly budget in INR
    #[serde(default)]
    pub budget_inr: Option<f64>,
    /// Meals per day
    #[serde(default = "default_meals_per_day")]
    pub meals_per_day: u8,
}

impl ProfileSubmission {
    /// Check required fields and biometric ranges
    ///
    /// # Errors
    ///
    /// Returns `MissingRequiredField` for blank name or phone and
    /// `InvalidInput` for out-of-range biometrics or meal counts.
    pub fn validate(&self) -> AppResult<()> {
        if self.name.trim().is_empty() {
            return Err(AppError::missing_field("name"));
        }
        if self.phone.trim().is_empty() {
            return Err(AppError::missing_field("phone"));
        }
        if !(MIN_AGE..=MAX_AGE).contains(&self.age) {
            return Err(AppError::invalid_input(format!(
                "age must be between {MIN_AGE} and {MAX_AGE}, got {}",
                self.age
            )));
        }
        if !self.weight_kg.is_finite() || !(MIN_WEIGHT_KG..=MAX_WEIGHT_KG).contains(&self.weight_kg)
        {
            return Err(AppError::invalid_input(format!(
                "weight_kg must be between {MIN_WEIGHT_KG} and {MAX_WEIGHT_KG}, got {}",
                self.weight_kg
            )));
        }
        if !self.height_cm.is_finite() || !(MIN_HEIGHT_CM..=MAX_HEIGHT_CM).contains(&self.height_cm)
        {
            return Err(AppError::invalid_input(format!(
                "height_cm must be between {MIN_HEIGHT_CM} and {MAX_HEIGHT_CM}, got {}",
                self.height_cm
            )));
        }
        if !(MIN_MEALS_PER_DAY..=MAX_MEALS_PER_DAY).contains(&self.meals_per_day) {
            return Err(AppError::invalid_input(format!(
                "meals_per_day must be between {MIN_MEALS_PER_DAY} and {MAX_MEALS_PER_DAY}, got {}",
                self.meals_per_day
            )));
        }
        Ok(())
    }
}
