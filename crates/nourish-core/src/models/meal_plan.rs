// ABOUTME: Meal plan document model with typed helpers over the stored JSON days
// ABOUTME: Dish traversal, image keys, and lenient recipe views
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::constants::plan_keys::{DISH_NAME, IMAGE_REF, SUMMARY};

/// Current meal plan for a user
///
/// `days` keeps the agent's structure: `{day_label → {meal_slot → dish entry}}`,
/// where a day may also carry a `summary` string. Keys stay in generation order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MealPlan {
    /// Plan identifier, stable across regenerations for the same user
    pub id: Uuid,
    /// Owning user
    pub user_id: Uuid,
    /// Nutrition report the plan was generated from
    pub nutrition_report_id: Uuid,
    /// Day documents
    pub days: Map<String, Value>,
    /// When the plan content was generated
    pub generated_at: DateTime<Utc>,
    /// When images or recipes were last attached
    pub updated_at: DateTime<Utc>,
}

/// Location of one dish inside a plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DishRef {
    /// Day label (e.g. "Day 1")
    pub day: String,
    /// Meal slot key (e.g. "Breakfast")
    pub slot: String,
    /// Dish name
    pub dish_name: String,
}

/// Stored image attached to a dish entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    /// Blob identifier in the image store
    pub blob_id: Uuid,
    /// Image key (`{day}_{dish}`)
    pub key: String,
    /// Public URL, when published
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Typed view of a generated recipe
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    /// Preparation time as written by the generator
    #[serde(default)]
    pub prep_time: Option<String>,
    /// Cooking time as written by the generator
    #[serde(default)]
    pub cook_time: Option<String>,
    /// Step label → instruction
    #[serde(default)]
    pub steps: BTreeMap<String, String>,
}

impl Recipe {
    /// Read a recipe from stored JSON, accepting step objects or step arrays
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let text = |key: &str| obj.get(key).and_then(Value::as_str).map(str::to_owned);
        let steps = match obj.get("steps") {
            Some(Value::Object(map)) => map
                .iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_owned())))
                .collect(),
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .enumerate()
                .map(|(i, s)| (format!("step-{}", i + 1), s.to_owned()))
                .collect(),
            _ => BTreeMap::new(),
        };
        Some(Self {
            prep_time: text("prep_time"),
            cook_time: text("cook_time"),
            steps,
        })
    }

    /// Steps sorted by their numeric suffix (`step-2` before `step-10`)
    #[must_use]
    pub fn ordered_steps(&self) -> Vec<(&str, &str)> {
        let mut steps: Vec<(&str, &str)> = self
            .steps
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        steps.sort_by_key(|(label, _)| {
            let digits: String = label.chars().filter(char::is_ascii_digit).collect();
            (digits.parse::<u32>().unwrap_or(u32::MAX), (*label).to_owned())
        });
        steps
    }
}

fn is_summary_key(key: &str) -> bool {
    key.eq_ignore_ascii_case(SUMMARY)
}

impl MealPlan {
    /// Keep only day entries whose value is an object
    #[must_use]
    pub fn normalize_days(raw: Map<String, Value>) -> Map<String, Value> {
        raw.into_iter().filter(|(_, v)| v.is_object()).collect()
    }

    /// Image key for a dish on a given day
    #[must_use]
    pub fn image_key(day: &str, dish_name: &str) -> String {
        format!("{day}_{}", dish_name.replace(' ', "_"))
    }

    /// Blob ids referenced by dish image refs in a days document
    #[must_use]
    pub fn image_blob_ids(days: &Map<String, Value>) -> Vec<Uuid> {
        days.values()
            .filter_map(Value::as_object)
            .flat_map(|meals| meals.values())
            .filter_map(|entry| entry.get(IMAGE_REF)?.get("blob_id")?.as_str())
            .filter_map(|raw| Uuid::parse_str(raw).ok())
            .collect()
    }

    /// Day labels in plan order
    #[must_use]
    pub fn day_labels(&self) -> Vec<String> {
        self.days
            .iter()
            .filter(|(_, v)| v.is_object())
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Meal entries for a day in plan order, skipping summaries and non-dish values
    #[must_use]
    pub fn meals_for_day(&self, day: &str) -> Vec<(&str, &Map<String, Value>)> {
        self.days
            .get(day)
            .and_then(Value::as_object)
            .map(|meals| {
                meals
                    .iter()
                    .filter(|(slot, _)| !is_summary_key(slot))
                    .filter_map(|(slot, entry)| {
                        entry
                            .as_object()
                            .filter(|e| e.get(DISH_NAME).and_then(Value::as_str).is_some())
                            .map(|e| (slot.as_str(), e))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Day summary text, if the planner wrote one
    #[must_use]
    pub fn day_summary(&self, day: &str) -> Option<&str> {
        self.days
            .get(day)?
            .as_object()?
            .iter()
            .find(|(k, _)| is_summary_key(k))
            .and_then(|(_, v)| v.as_str())
    }

    /// Every dish in the plan, in order
    #[must_use]
    pub fn dishes(&self) -> Vec<DishRef> {
        self.day_labels()
            .into_iter()
            .flat_map(|day| {
                self.meals_for_day(&day)
                    .into_iter()
                    .filter_map(|(slot, entry)| {
                        entry.get(DISH_NAME).and_then(Value::as_str).map(|dish| DishRef {
                            day: day.clone(),
                            slot: slot.to_owned(),
                            dish_name: dish.to_owned(),
                        })
                    })
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// Immutable access to a dish entry
    #[must_use]
    pub fn dish_entry(&self, day: &str, slot: &str) -> Option<&Map<String, Value>> {
        self.days.get(day)?.as_object()?.get(slot)?.as_object()
    }

    /// Mutable access to a dish entry for attaching images and recipes
    pub fn dish_entry_mut(&mut self, day: &str, slot: &str) -> Option<&mut Map<String, Value>> {
        self.days
            .get_mut(day)?
            .as_object_mut()?
            .get_mut(slot)?
            .as_object_mut()
    }
}
