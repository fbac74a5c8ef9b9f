// ABOUTME: Nutrition calculator types and the persisted nutrition report model
// ABOUTME: Closed enums for gender, activity, goal and diet with explicit Unspecified variants
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

/// Biological sex used to pick the Mifflin-St Jeor constant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    /// Male constant (+5)
    Male,
    /// Female constant (-161)
    Female,
    /// Descriptor not recognised; calculated with the female constant
    Unspecified,
}

impl Gender {
    /// Resolve a free-text descriptor: leading "m" is male, leading "f" is female
    #[must_use]
    pub fn from_descriptor(raw: &str) -> Self {
        let lower = raw.trim().to_lowercase();
        if lower.starts_with('m') {
            Self::Male
        } else if lower.starts_with('f') {
            Self::Female
        } else {
            Self::Unspecified
        }
    }

    /// Canonical string form
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
            Self::Unspecified => "unspecified",
        }
    }
}

/// Activity level classes of the Harris-Benedict/Mifflin activity table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    /// Little or no exercise
    Sedentary,
    /// Light exercise 1-3 days per week
    LightlyActive,
    /// Moderate exercise 3-5 days per week
    ModeratelyActive,
    /// Hard exercise 6-7 days per week
    VeryActive,
    /// Athlete or physical job
    ExtraActive,
    /// Descriptor not recognised; calculated as moderately active
    Unspecified,
}

/// Keyword table for activity descriptors, checked in order
const ACTIVITY_KEYWORDS: &[(&str, ActivityLevel)] = &[
    ("sedentary", ActivityLevel::Sedentary),
    ("light", ActivityLevel::LightlyActive),
    ("moderate", ActivityLevel::ModeratelyActive),
    ("very", ActivityLevel::VeryActive),
    ("extra", ActivityLevel::ExtraActive),
    ("athlete", ActivityLevel::ExtraActive),
];

impl ActivityLevel {
    /// Resolve a free-text descriptor by case-insensitive keyword match
    #[must_use]
    pub fn from_descriptor(raw: &str) -> Self {
        let lower = raw.to_lowercase();
        ACTIVITY_KEYWORDS
            .iter()
            .find(|(keyword, _)| lower.contains(keyword))
            .map_or(Self::Unspecified, |(_, level)| *level)
    }

    /// Canonical string form
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Sedentary => "sedentary",
            Self::LightlyActive => "lightly_active",
            Self::ModeratelyActive => "moderately_active",
            Self::VeryActive => "very_active",
            Self::ExtraActive => "extra_active",
            Self::Unspecified => "unspecified",
        }
    }
}

/// Calorie goal relative to maintenance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Goal {
    /// Calorie deficit
    WeightLoss,
    /// Calorie surplus
    MuscleGain,
    /// Explicit maintenance
    Maintenance,
    /// Descriptor missing or not recognised; calculated as maintenance
    Unspecified,
}

impl Goal {
    /// Resolve a free-text descriptor by case-insensitive keyword match
    #[must_use]
    pub fn from_descriptor(raw: &str) -> Self {
        let lower = raw.to_lowercase();
        if lower.contains("loss") {
            Self::WeightLoss
        } else if lower.contains("gain") {
            Self::MuscleGain
        } else if lower.contains("maint") {
            Self::Maintenance
        } else {
            Self::Unspecified
        }
    }

    /// Canonical string form
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::WeightLoss => "weight_loss",
            Self::MuscleGain => "muscle_gain",
            Self::Maintenance => "maintenance",
            Self::Unspecified => "unspecified",
        }
    }
}

/// Dietary pattern, used for micronutrient suggestions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DietType {
    /// Lacto-vegetarian or similar
    Vegetarian,
    /// No animal products
    Vegan,
    /// Includes meat or fish
    NonVegetarian,
    /// Any other non-empty descriptor
    Other,
    /// No descriptor given
    Unspecified,
}

impl DietType {
    /// Resolve a free-text descriptor
    ///
    /// Negated forms ("non-veg", "non veg", "nonveg") are checked first so
    /// that "Non-vegetarian" is never read as vegetarian. Only the words
    /// "vegan" and "vegetarian" mark a plant-based diet.
    #[must_use]
    pub fn from_descriptor(raw: &str) -> Self {
        let lower = raw.trim().to_lowercase();
        if lower.is_empty() {
            return Self::Unspecified;
        }
        if ["non-veg", "non veg", "nonveg"]
            .iter()
            .any(|neg| lower.contains(neg))
        {
            Self::NonVegetarian
        } else if lower.contains("vegan") {
            Self::Vegan
        } else if lower.contains("vegetarian") {
            Self::Vegetarian
        } else {
            Self::Other
        }
    }

    /// Whether the diet excludes meat
    #[must_use]
    pub const fn is_plant_based(&self) -> bool {
        matches!(self, Self::Vegetarian | Self::Vegan)
    }

    /// Canonical string form
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Vegetarian => "vegetarian",
            Self::Vegan => "vegan",
            Self::NonVegetarian => "non_vegetarian",
            Self::Other => "other",
            Self::Unspecified => "unspecified",
        }
    }
}

/// Non-fatal findings recorded during a calculation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "detail", rename_all = "snake_case")]
pub enum CalculatorWarning {
    /// Activity descriptor matched no keyword; default factor used
    UnrecognizedActivity(String),
    /// Goal descriptor matched no keyword; maintenance used
    UnrecognizedGoal(String),
    /// Gender descriptor matched neither prefix; female constant used
    UnrecognizedGender(String),
    /// Target calories fall below the basal metabolic rate
    BelowBmr {
        /// Target calories
        calories: i64,
        /// Basal metabolic rate
        bmr: i64,
    },
    /// Protein and fat already exceed the calorie target
    NegativeCarbohydrates {
        /// Resulting carbohydrate grams
        carbs_g: i64,
    },
}

impl fmt::Display for CalculatorWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnrecognizedActivity(raw) => write!(
                f,
                "Activity level '{raw}' not recognised; assumed moderately active"
            ),
            Self::UnrecognizedGoal(raw) => {
                write!(f, "Goal '{raw}' not recognised; assumed maintenance")
            }
            Self::UnrecognizedGender(raw) => write!(
                f,
                "Gender '{raw}' not recognised; female BMR constant used"
            ),
            Self::BelowBmr { calories, bmr } => write!(
                f,
                "Target calories ({calories} kcal) below estimated BMR ({bmr} kcal)"
            ),
            Self::NegativeCarbohydrates { carbs_g } => write!(
                f,
                "Protein and fat exceed the calorie target; carbohydrates computed as {carbs_g} g"
            ),
        }
    }
}

/// Deterministic calculator output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutritionTargets {
    /// Basal metabolic rate (kcal/day)
    pub bmr: f64,
    /// Total daily energy expenditure (kcal/day)
    pub tdee: f64,
    /// Goal-adjusted calories before rounding
    pub target_calories: f64,
    /// Daily calories, rounded
    pub calories: i64,
    /// Daily protein grams, rounded
    pub protein_g: i64,
    /// Daily carbohydrate grams, rounded
    pub carbs_g: i64,
    /// Daily fat grams, rounded
    pub fat_g: i64,
    /// Protein grams per kilogram of body weight
    pub protein_g_per_kg: f64,
    /// Suggested micronutrients, ordered and without duplicates
    pub vitamins: Vec<String>,
    /// Resolved activity class
    pub activity_level: ActivityLevel,
    /// Resolved goal
    pub goal: Goal,
    /// Resolved diet
    pub diet: DietType,
    /// Resolved gender
    pub gender: Gender,
    /// Findings that did not stop the calculation
    #[serde(default)]
    pub warnings: Vec<CalculatorWarning>,
    /// One-paragraph human summary
    pub analysis: String,
}

impl NutritionTargets {
    /// Report document built from the calculator alone
    ///
    /// Shaped like the Nutrition Analyst output so consumers read both the same way.
    #[must_use]
    pub fn to_report_json(&self) -> Value {
        serde_json::json!({
            "nutrition_summary": {
                "calories": self.calories,
                "protein_g": self.protein_g,
                "carbs_g": self.carbs_g,
                "fat_g": self.fat_g,
                "protein_g_per_kg": self.protein_g_per_kg,
            },
            "micronutrients": self.vitamins.iter().map(|name| serde_json::json!({ "name": name })).collect::<Vec<_>>(),
            "meal_targets": Value::Null,
            "diet_constraints": { "diet_type": self.diet.as_str() },
            "warnings": self.warnings.iter().map(|w| serde_json::json!({ "type": "calculator", "message": w.to_string() })).collect::<Vec<_>>(),
            "human_summary": self.analysis,
        })
    }

    /// Tool-call result returned to the Nutrition Analyst
    #[must_use]
    pub fn to_tool_result(&self) -> Value {
        serde_json::json!({
            "calories": self.calories,
            "protein_g": self.protein_g,
            "carbs_g": self.carbs_g,
            "fat_g": self.fat_g,
            "vitamins": self.vitamins,
            "analysis": self.analysis,
        })
    }
}

/// Current nutrition report for a user (one per user, replaced on regeneration)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NutritionReport {
    /// Report identifier, stable across regenerations
    pub id: Uuid,
    /// Owning user
    pub user_id: Uuid,
    /// Deterministic baseline
    pub targets: NutritionTargets,
    /// Agent elaboration (or the calculator-only document)
    pub report: Value,
    /// Generation time
    pub generated_at: DateTime<Utc>,
}

fn as_rounded_int(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|f| f.round() as i64))
}

impl NutritionReport {
    fn summary_int(&self, key: &str) -> Option<i64> {
        self.report
            .get("nutrition_summary")
            .and_then(|s| s.get(key))
            .and_then(as_rounded_int)
    }

    /// Daily calories
    #[must_use]
    pub fn calories(&self) -> i64 {
        self.summary_int("calories").unwrap_or(self.targets.calories)
    }

    /// Daily protein grams
    #[must_use]
    pub fn protein_g(&self) -> i64 {
        self.summary_int("protein_g").unwrap_or(self.targets.protein_g)
    }

    /// Daily carbohydrate grams
    #[must_use]
    pub fn carbs_g(&self) -> i64 {
        self.summary_int("carbs_g").unwrap_or(self.targets.carbs_g)
    }

    /// Daily fat grams
    #[must_use]
    pub fn fat_g(&self) -> i64 {
        self.summary_int("fat_g").unwrap_or(self.targets.fat_g)
    }

    /// Micronutrient names
    #[must_use]
    pub fn micronutrients(&self) -> Vec<String> {
        let names: Vec<String> = self
            .report
            .get("micronutrients")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| match item {
                        Value::String(name) => Some(name.clone()),
                        Value::Object(obj) => obj
                            .get("name")
                            .and_then(Value::as_str)
                            .map(str::to_owned),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default();
        if names.is_empty() {
            self.targets.vitamins.clone()
        } else {
            names
        }
    }

    /// Per-meal allocation block, `Null` when absent
    #[must_use]
    pub fn meal_targets(&self) -> Value {
        self.report
            .get("meal_targets")
            .cloned()
            .unwrap_or(Value::Null)
    }

    /// Diet constraints block, `Null` when absent
    #[must_use]
    pub fn constraints(&self) -> Value {
        self.report
            .get("diet_constraints")
            .cloned()
            .unwrap_or(Value::Null)
    }

    /// Warning messages
    #[must_use]
    pub fn warnings(&self) -> Vec<String> {
        let messages: Vec<String> = self
            .report
            .get("warnings")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| match item {
                        Value::String(msg) => Some(msg.clone()),
                        Value::Object(obj) => obj
                            .get("message")
                            .and_then(Value::as_str)
                            .map(str::to_owned),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default();
        if messages.is_empty() {
            self.targets.warnings.iter().map(ToString::to_string).collect()
        } else {
            messages
        }
    }

    /// Short friendly summary
    #[must_use]
    pub fn human_summary(&self) -> String {
        self.report
            .get("human_summary")
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .map_or_else(|| self.targets.analysis.clone(), str::to_owned)
    }

    /// Agent-facing view with ids rendered as plain strings
    #[must_use]
    pub fn to_agent_payload(&self) -> Value {
        let mut payload = self.report.clone();
        if let Value::Object(map) = &mut payload {
            map.insert("report_id".into(), Value::String(self.id.to_string()));
            map.insert("user_id".into(), Value::String(self.user_id.to_string()));
        }
        payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activity_keywords_case_insensitive() {
        assert_eq!(
            ActivityLevel::from_descriptor("Moderately active"),
            ActivityLevel::ModeratelyActive
        );
        assert_eq!(
            ActivityLevel::from_descriptor("SEDENTARY (desk job)"),
            ActivityLevel::Sedentary
        );
        assert_eq!(
            ActivityLevel::from_descriptor("Lightly Active"),
            ActivityLevel::LightlyActive
        );
        assert_eq!(
            ActivityLevel::from_descriptor("competitive athlete"),
            ActivityLevel::ExtraActive
        );
        assert_eq!(
            ActivityLevel::from_descriptor("couch"),
            ActivityLevel::Unspecified
        );
    }

    #[test]
    fn test_goal_keywords() {
        assert_eq!(Goal::from_descriptor("Weight Loss"), Goal::WeightLoss);
        assert_eq!(Goal::from_descriptor("muscle gain"), Goal::MuscleGain);
        assert_eq!(Goal::from_descriptor("Maintain"), Goal::Maintenance);
        assert_eq!(Goal::from_descriptor(""), Goal::Unspecified);
    }

    #[test]
    fn test_diet_negation_checked_first() {
        assert_eq!(
            DietType::from_descriptor("Non-vegetarian"),
            DietType::NonVegetarian
        );
        assert_eq!(DietType::from_descriptor("non veg"), DietType::NonVegetarian);
        assert_eq!(DietType::from_descriptor("Vegan"), DietType::Vegan);
        assert_eq!(
            DietType::from_descriptor("Lacto vegetarian"),
            DietType::Vegetarian
        );
        assert_eq!(DietType::from_descriptor("Pescatarian"), DietType::Other);
        assert_eq!(DietType::from_descriptor("  "), DietType::Unspecified);
    }

    #[test]
    fn test_diet_needs_full_word() {
        for raw in ["veggie-friendly", "veg", "Vegetables only"] {
            let diet = DietType::from_descriptor(raw);
            assert_eq!(diet, DietType::Other, "{raw}");
            assert!(!diet.is_plant_based());
        }
    }

    #[test]
    fn test_gender_prefix() {
        assert_eq!(Gender::from_descriptor(" Male"), Gender::Male);
        assert_eq!(Gender::from_descriptor("F"), Gender::Female);
        assert_eq!(Gender::from_descriptor("other"), Gender::Unspecified);
    }

    #[test]
    fn test_warning_serializes_with_tag() {
        let warning = CalculatorWarning::UnrecognizedGoal("bulk".into());
        let json = serde_json::to_value(&warning).unwrap();
        assert_eq!(json["type"], "unrecognized_goal");
        assert_eq!(json["detail"], "bulk");
    }
}
