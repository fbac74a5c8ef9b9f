// ABOUTME: Constants module with domain-separated organization
// ABOUTME: Nutrition science defaults, pipeline limits, document keys and service defaults
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! Constants module
//!
//! Constants are grouped into logical domains rather than being in a single large file.

/// Mifflin-St Jeor and macro split defaults
pub mod nutrition {
    /// Weight coefficient (kcal per kg)
    pub const MSJ_WEIGHT_COEF: f64 = 10.0;
    /// Height coefficient (kcal per cm)
    pub const MSJ_HEIGHT_COEF: f64 = 6.25;
    /// Age coefficient (kcal per year)
    pub const MSJ_AGE_COEF: f64 = -5.0;
    /// Additive constant for males
    pub const MSJ_MALE_CONSTANT: f64 = 5.0;
    /// Additive constant for females
    pub const MSJ_FEMALE_CONSTANT: f64 = -161.0;

    /// Activity factor: little or no exercise
    pub const ACTIVITY_SEDENTARY: f64 = 1.2;
    /// Activity factor: light exercise 1-3 days per week
    pub const ACTIVITY_LIGHTLY_ACTIVE: f64 = 1.375;
    /// Activity factor: moderate exercise 3-5 days per week
    pub const ACTIVITY_MODERATELY_ACTIVE: f64 = 1.55;
    /// Activity factor: hard exercise 6-7 days per week
    pub const ACTIVITY_VERY_ACTIVE: f64 = 1.725;
    /// Activity factor: athlete or physical job
    pub const ACTIVITY_EXTRA_ACTIVE: f64 = 1.9;

    /// Calorie multiplier for weight loss goals
    pub const GOAL_WEIGHT_LOSS: f64 = 0.85;
    /// Calorie multiplier for muscle gain goals
    pub const GOAL_MUSCLE_GAIN: f64 = 1.15;
    /// Calorie multiplier for maintenance
    pub const GOAL_MAINTENANCE: f64 = 1.0;

    /// Protein grams per kilogram of body weight
    pub const PROTEIN_G_PER_KG: f64 = 2.0;
    /// Share of target calories allotted to fat
    pub const FAT_CALORIE_SHARE: f64 = 0.25;
    /// Energy density of protein (kcal/g)
    pub const KCAL_PER_G_PROTEIN: f64 = 4.0;
    /// Energy density of carbohydrate (kcal/g)
    pub const KCAL_PER_G_CARBS: f64 = 4.0;
    /// Energy density of fat (kcal/g)
    pub const KCAL_PER_G_FAT: f64 = 9.0;

    /// Suggested for plant-based diets
    pub const VITAMIN_B12: &str = "Vitamin B12";
    /// Suggested for plant-based diets and women
    pub const IRON: &str = "Iron";
    /// Suggested for plant-based diets
    pub const OMEGA_3: &str = "Omega-3";
    /// Always suggested
    pub const VITAMIN_D: &str = "Vitamin D";
}

/// Profile validation bounds
pub mod profile {
    /// Youngest accepted age in years
    pub const MIN_AGE: u32 = 1;
    /// Oldest accepted age in years
    pub const MAX_AGE: u32 = 120;
    /// Lightest accepted weight in kg
    pub const MIN_WEIGHT_KG: f64 = 1.0;
    /// Heaviest accepted weight in kg
    pub const MAX_WEIGHT_KG: f64 = 500.0;
    /// Shortest accepted height in cm
    pub const MIN_HEIGHT_CM: f64 = 30.0;
    /// Tallest accepted height in cm
    pub const MAX_HEIGHT_CM: f64 = 300.0;
    /// Fewest meals per day
    pub const MIN_MEALS_PER_DAY: u8 = 1;
    /// Most meals per day
    pub const MAX_MEALS_PER_DAY: u8 = 8;
    /// Default meals per day
    pub const DEFAULT_MEALS_PER_DAY: u8 = 3;
}

/// JSON keys used inside stored meal plan documents
pub mod plan_keys {
    /// Per-day motivational summary (not a meal slot)
    pub const SUMMARY: &str = "summary";
    /// Dish name inside a meal entry
    pub const DISH_NAME: &str = "dish_name";
    /// Meal display name inside a meal entry
    pub const MEAL_NAME: &str = "meal_name";
    /// Share of daily calories
    pub const CALORIES_PERCENTAGE: &str = "calories_percentage";
    /// Share of daily protein
    pub const PROTEIN_PERCENTAGE: &str = "protein_percentage";
    /// Micronutrient highlight text
    pub const HIGHLIGHTS: &str = "vitamin_mineral_highlights";
    /// Attached image reference
    pub const IMAGE_REF: &str = "image_ref";
    /// Attached recipe
    pub const RECIPE: &str = "recipe";
}

/// Pricing document defaults
pub mod pricing {
    /// Currency assumed for predicted prices
    pub const DEFAULT_CURRENCY: &str = "INR";
    /// Grand total key emitted by the price predictor
    pub const GRAND_TOTAL_KEY: &str = "Grand_Total";
    /// Per-category total key
    pub const TOTAL_PRICE_KEY: &str = "total_price";
}

/// Pipeline and agent limits
pub mod limits {
    /// Maximum function-calling rounds before forcing a final answer
    pub const MAX_TOOL_ITERATIONS: usize = 4;
    /// Default agent timeout in seconds
    pub const DEFAULT_AGENT_TIMEOUT_SECS: u64 = 120;
    /// Default retry backoff in milliseconds
    pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 500;
    /// Default number of days in a generated plan
    pub const DEFAULT_PLAN_DAYS: u8 = 2;
    /// Characters of raw model output kept in parse-failure logs
    pub const RAW_OUTPUT_PREVIEW_CHARS: usize = 240;
}

/// Network defaults
pub mod network {
    /// Default HTTP port
    pub const DEFAULT_HTTP_PORT: u16 = 8081;
    /// Default bind address
    pub const DEFAULT_HOST: &str = "0.0.0.0";
    /// Default database URL
    pub const DEFAULT_DATABASE_URL: &str = "sqlite:./data/nourish.db";
}

/// Notification defaults
pub mod notifications {
    /// Default daily reminder times (local)
    pub const DEFAULT_NOTIFY_TIMES: &str = "07:00,12:00,20:00";
    /// Default offset from UTC in minutes (IST)
    pub const DEFAULT_UTC_OFFSET_MINUTES: i32 = 330;
    /// Default country calling code for bare numbers
    pub const DEFAULT_COUNTRY_CODE: &str = "+91";
    /// Name used when a profile has none
    pub const FALLBACK_NAME: &str = "Friend";
}

/// Service identity
pub mod service {
    /// Service name used in logs
    pub const SERVICE_NAME: &str = "nourish-server";
    /// Service version from Cargo
    pub const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");
}
