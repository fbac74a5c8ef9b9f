// ABOUTME: Local tools that agents can call during the tool-calling loop
// ABOUTME: Defines the AgentTool trait and the calculate_nutrition tool backed by the calculator
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::NutritionConfig;
use crate::errors::{AppError, AppResult};
use crate::intelligence::{calculate_nutrition, NutritionInputs};
use crate::llm::FunctionDeclaration;

/// A function an agent may call, executed in-process
pub trait AgentTool: Send + Sync {
    /// Declaration advertised to the model
    fn declaration(&self) -> FunctionDeclaration;

    /// Tool name, matched against the model's function calls
    fn name(&self) -> &'static str;

    /// Run the tool with model-supplied arguments
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` when the arguments do not match the declaration.
    fn execute(&self, args: &Value) -> AppResult<Value>;
}

/// Arguments as the model sends them; numbers may arrive as floats
#[derive(Debug, Deserialize)]
struct NutritionToolArgs {
    age: f64,
    gender: String,
    weight: f64,
    height: f64,
    activity: String,
    goal: String,
    #[serde(default)]
    diet: String,
}

/// `calculate_nutrition(age, gender, weight, height, activity, goal, diet)`
#[derive(Debug, Clone, Default)]
pub struct NutritionTool {
    config: NutritionConfig,
}

impl NutritionTool {
    /// Name the model calls the tool by
    pub const NAME: &'static str = "calculate_nutrition";

    /// Tool using the given calculator constants
    #[must_use]
    pub const fn new(config: NutritionConfig) -> Self {
        Self { config }
    }
}

impl AgentTool for NutritionTool {
    fn declaration(&self) -> FunctionDeclaration {
        FunctionDeclaration {
            name: Self::NAME.to_owned(),
            description: "Science-based daily nutrition targets: Mifflin-St Jeor BMR, activity-scaled TDEE, goal-adjusted calories, macronutrient grams and micronutrient suggestions.".to_owned(),
            parameters: Some(json!({
                "type": "object",
                "properties": {
                    "age": {"type": "integer", "description": "Age in years"},
                    "gender": {"type": "string", "description": "Male or Female"},
                    "weight": {"type": "number", "description": "Body weight in kilograms"},
                    "height": {"type": "number", "description": "Height in centimeters"},
                    "activity": {"type": "string", "description": "Activity level, e.g. Sedentary, Lightly active, Moderately active, Very active, Extra active"},
                    "goal": {"type": "string", "description": "Weight loss, Muscle gain or Maintenance"},
                    "diet": {"type": "string", "description": "Diet type, e.g. Vegetarian, Vegan, Non-vegetarian"}
                },
                "required": ["age", "gender", "weight", "height", "activity", "goal"]
            })),
        }
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn execute(&self, args: &Value) -> AppResult<Value> {
        let args: NutritionToolArgs = serde_json::from_value(args.clone()).map_err(|e| {
            AppError::invalid_input(format!("Invalid {} arguments: {e}", Self::NAME))
        })?;

        if !args.age.is_finite() || args.age < 0.0 {
            return Err(AppError::invalid_input(format!(
                "age must be a non-negative number, got {}",
                args.age
            )));
        }

        let inputs = NutritionInputs {
            age: args.age.round() as u32,
            gender: args.gender,
            weight_kg: args.weight,
            height_cm: args.height,
            activity: args.activity,
            goal: args.goal,
            diet: args.diet,
        };
        Ok(calculate_nutrition(&inputs, &self.config).to_tool_result())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_accepts_float_age() {
        let tool = NutritionTool::default();
        let result = tool
            .execute(&json!({
                "age": 30.0, "gender": "male", "weight": 70, "height": 175,
                "activity": "Moderately active", "goal": "maintenance"
            }))
            .unwrap_or_default();
        assert_eq!(result["protein_g"], json!(140));
        assert!(result["analysis"].is_string());
    }

    #[test]
    fn test_tool_rejects_missing_fields() {
        let err = NutritionTool::default()
            .execute(&json!({"age": 30}))
            .err()
            .map(|e| e.code);
        assert_eq!(err, Some(crate::errors::ErrorCode::InvalidInput));
    }

    #[test]
    fn test_declaration_schema_requires_biometrics() {
        let declaration = NutritionTool::default().declaration();
        assert_eq!(declaration.name, "calculate_nutrition");
        let required = declaration
            .parameters
            .and_then(|p| p.get("required").cloned())
            .unwrap_or_default();
        assert!(required.as_array().is_some_and(|r| r.len() == 6));
    }
}
