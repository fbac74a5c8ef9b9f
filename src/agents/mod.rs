// ABOUTME: Named pipeline agents: role, instruction template, bound tool and output mode
// ABOUTME: Agents are fixed LLM call configurations invoked through the AgentRunner
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! # Agents
//!
//! An agent is a hosted language-model call configured with a fixed role,
//! an instruction template and an optional callable tool. Six agents back
//! the pipeline:
//!
//! | Agent | Output | Tool |
//! |-------|--------|------|
//! | Nutrition Analyst | JSON report | `calculate_nutrition` |
//! | Meal Planner | JSON plan keyed by day | |
//! | Recipe Generator | JSON recipe | |
//! | Shopping List Generator | JSON categories | |
//! | Shopping Price Predictor | JSON priced categories | |
//! | `WhatsApp` Message Writer | free text | |

/// JSON recovery from model output
pub mod extraction;
/// Agent invocation with timeout, retry and the tool loop
pub mod runner;
/// Locally executed agent tools
pub mod tools;

pub use extraction::{extract_json_object, extract_json_value};
pub use runner::AgentRunner;
pub use tools::{AgentTool, NutritionTool};

use serde::{Deserialize, Serialize};
use std::fmt;

/// The named agents of the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    /// Elaborates calculator targets into a planner brief
    NutritionAnalyst,
    /// Builds the multi-day meal plan
    MealPlanner,
    /// Writes a recipe for one dish
    RecipeGenerator,
    /// Extracts a categorized ingredient list from a plan
    ShoppingListGenerator,
    /// Prices a shopping list in INR
    PricePredictor,
    /// Writes a short meal reminder
    MessageWriter,
}

/// Static configuration of one agent
#[derive(Debug, Clone, Copy)]
pub struct AgentSpec {
    /// Display name
    pub name: &'static str,
    /// One-line role
    pub role: &'static str,
    /// Instruction template (markdown)
    pub instructions: &'static str,
    /// Name of the bound tool, if any
    pub tool: Option<&'static str>,
    /// Whether structured JSON output is requested
    pub structured_output: bool,
    /// Sampling temperature
    pub temperature: f32,
}

const NUTRITION_ANALYST: AgentSpec = AgentSpec {
    name: "Nutrition Analyst",
    role: "Estimate calorie, macro and micronutrient needs and prepare a machine-readable brief for the Meal Planner.",
    instructions: include_str!("prompts/nutrition_analyst.md"),
    tool: Some(NutritionTool::NAME),
    structured_output: true,
    temperature: 0.2,
};

const MEAL_PLANNER: AgentSpec = AgentSpec {
    name: "Meal Planner",
    role: "Generate multi-day meal plans that meet the nutrition brief.",
    instructions: include_str!("prompts/meal_planner.md"),
    tool: None,
    structured_output: true,
    temperature: 0.7,
};

const RECIPE_GENERATOR: AgentSpec = AgentSpec {
    name: "Recipe Generator",
    role: "Generate step-by-step recipe instructions for a given meal.",
    instructions: include_str!("prompts/recipe_generator.md"),
    tool: None,
    structured_output: true,
    temperature: 0.4,
};

const SHOPPING_LIST_GENERATOR: AgentSpec = AgentSpec {
    name: "Shopping List Generator",
    role: "Generate a shopping list from a meal plan, grouped by category.",
    instructions: include_str!("prompts/shopping_list.md"),
    tool: None,
    structured_output: true,
    temperature: 0.1,
};

const PRICE_PREDICTOR: AgentSpec = AgentSpec {
    name: "Shopping Price Predictor",
    role: "Predict INR prices for a categorized shopping list.",
    instructions: include_str!("prompts/price_predictor.md"),
    tool: None,
    structured_output: true,
    temperature: 0.1,
};

const MESSAGE_WRITER: AgentSpec = AgentSpec {
    name: "WhatsApp Message Writer",
    role: "Write short, tempting messages that encourage users to enjoy their healthy meals.",
    instructions: include_str!("prompts/message_writer.md"),
    tool: None,
    structured_output: false,
    temperature: 0.9,
};

impl AgentKind {
    /// Every agent, in pipeline order
    #[must_use]
    pub const fn all() -> [Self; 6] {
        [
            Self::NutritionAnalyst,
            Self::MealPlanner,
            Self::RecipeGenerator,
            Self::ShoppingListGenerator,
            Self::PricePredictor,
            Self::MessageWriter,
        ]
    }

    /// Static configuration for this agent
    #[must_use]
    pub const fn spec(self) -> AgentSpec {
        match self {
            Self::NutritionAnalyst => NUTRITION_ANALYST,
            Self::MealPlanner => MEAL_PLANNER,
            Self::RecipeGenerator => RECIPE_GENERATOR,
            Self::ShoppingListGenerator => SHOPPING_LIST_GENERATOR,
            Self::PricePredictor => PRICE_PREDICTOR,
            Self::MessageWriter => MESSAGE_WRITER,
        }
    }

    /// Display name
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        self.spec().name
    }

    /// Whether this agent runs on the messaging provider
    #[must_use]
    pub const fn uses_message_provider(self) -> bool {
        matches!(self, Self::MessageWriter)
    }

    /// System instructions with template values filled in
    #[must_use]
    pub fn render_instructions(self, plan_days: u8) -> String {
        let spec = self.spec();
        let body = spec.instructions.replace("{{days}}", &plan_days.to_string());
        format!("# {}\n\nRole: {}\n\n{body}", spec.name, spec.role)
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_nutrition_analyst_has_tool() {
        for kind in AgentKind::all() {
            assert_eq!(
                kind.spec().tool.is_some(),
                kind == AgentKind::NutritionAnalyst
            );
        }
    }

    #[test]
    fn test_meal_planner_days_rendered() {
        let text = AgentKind::MealPlanner.render_instructions(3);
        assert!(text.contains("3 consecutive days"));
        assert!(text.contains("\"Day 1\" through \"Day 3\""));
        assert!(!text.contains("{{days}}"));
    }

    #[test]
    fn test_message_writer_is_free_text() {
        let spec = AgentKind::MessageWriter.spec();
        assert!(!spec.structured_output);
        assert!(AgentKind::MessageWriter.uses_message_provider());
        assert_eq!(spec.name, "WhatsApp Message Writer");
    }
}
