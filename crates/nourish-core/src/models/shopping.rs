// ABOUTME: Shopping list and predicted pricing models derived from a meal plan
// ABOUTME: Lenient parsing of categorized ingredient lists and per-category price totals
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::constants::pricing::{DEFAULT_CURRENCY, GRAND_TOTAL_KEY, TOTAL_PRICE_KEY};
use crate::errors::{AppError, AppResult};

/// Consolidated ingredient list for one meal plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShoppingList {
    /// List identifier
    pub id: Uuid,
    /// Owning user
    pub user_id: Uuid,
    /// Meal plan the list was extracted from (unique)
    pub source_meal_plan_id: Uuid,
    /// Category → ingredient names
    pub categories: BTreeMap<String, Vec<String>>,
    /// Predicted prices, cleared whenever the list is regenerated
    #[serde(default)]
    pub pricing: Option<PricingDetails>,
    /// First creation time
    pub created_at: DateTime<Utc>,
    /// Last regeneration or pricing time
    pub updated_at: DateTime<Utc>,
}

impl ShoppingList {
    /// Normalize agent output into category → string items
    ///
    /// Non-string items are stringified and non-array categories are dropped.
    #[must_use]
    pub fn normalize_categories(raw: &Value) -> BTreeMap<String, Vec<String>> {
        let Some(obj) = raw.as_object() else {
            return BTreeMap::new();
        };
        obj.iter()
            .filter_map(|(category, items)| {
                items.as_array().map(|items| {
                    let names = items
                        .iter()
                        .map(|item| match item {
                            Value::String(s) => s.trim().to_owned(),
                            other => other.to_string(),
                        })
                        .filter(|s| !s.is_empty())
                        .collect();
                    (category.clone(), names)
                })
            })
            .collect()
    }

    /// Total number of items across categories
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.categories.values().map(Vec::len).sum()
    }
}

/// A single priced ingredient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricedItem {
    /// Ingredient name
    pub name: String,
    /// Predicted price
    pub price: f64,
}

/// Priced items for one category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricedCategory {
    /// Items with prices
    pub items: Vec<PricedItem>,
    /// Category total
    pub total_price: f64,
}

/// Predicted cost of a shopping list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingDetails {
    /// Category → priced items
    pub categories: BTreeMap<String, PricedCategory>,
    /// Sum over all categories
    pub grand_total: f64,
    /// Currency code
    pub currency: String,
}

/// Read a price written as a number or as text like "₹40" or "40.5"
fn parse_price(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let cleaned: String = s
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.')
                .collect();
            cleaned.parse().ok()
        }
        _ => None,
    }
}

impl PricingDetails {
    /// Parse the price predictor's output
    ///
    /// A missing `total_price` is computed from the items and a missing
    /// `Grand_Total` from the category totals.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` when the value is not an object or contains no
    /// priced category.
    pub fn from_agent_value(raw: &Value) -> AppResult<Self> {
        let obj = raw
            .as_object()
            .ok_or_else(|| AppError::invalid_input("pricing output is not a JSON object"))?;

        let mut categories = BTreeMap::new();
        for (name, body) in obj {
            if name.eq_ignore_ascii_case(GRAND_TOTAL_KEY) {
                continue;
            }
            let Some(items_value) = body.get("items").and_then(Value::as_array) else {
                continue;
            };
            let items: Vec<PricedItem> = items_value
                .iter()
                .filter_map(|item| {
                    let name = item.get("name").and_then(Value::as_str)?;
                    let price = item.get("price").and_then(parse_price).unwrap_or(0.0);
                    Some(PricedItem {
                        name: name.to_owned(),
                        price,
                    })
                })
                .collect();
            let total_price = body
                .get(TOTAL_PRICE_KEY)
                .and_then(parse_price)
                .unwrap_or_else(|| items.iter().map(|i| i.price).sum());
            categories.insert(name.clone(), PricedCategory { items, total_price });
        }

        if categories.is_empty() {
            return Err(AppError::invalid_input(
                "pricing output contains no priced categories",
            ));
        }

        let grand_total = obj
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(GRAND_TOTAL_KEY))
            .and_then(|(_, v)| parse_price(v))
            .unwrap_or_else(|| categories.values().map(|c| c.total_price).sum());

        Ok(Self {
            categories,
            grand_total,
            currency: DEFAULT_CURRENCY.to_owned(),
        })
    }

    /// (category, total) pairs for charts and summaries
    #[must_use]
    pub fn cost_breakdown(&self) -> Vec<(String, f64)> {
        self.categories
            .iter()
            .map(|(name, cat)| (name.clone(), cat.total_price))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pricing_parses_predictor_shape() {
        let raw = json!({
            "Groceries": {
                "items": [{"name": "Whole wheat flour", "price": 40}, {"name": "Ghee", "price": 120}],
                "total_price": 160
            },
            "Vegetables": {
                "items": [{"name": "Tomato", "price": "₹30"}]
            },
            "Grand_Total": 190
        });
        let pricing = PricingDetails::from_agent_value(&raw).unwrap();
        assert_eq!(pricing.categories.len(), 2);
        assert!((pricing.categories["Vegetables"].total_price - 30.0).abs() < f64::EPSILON);
        assert!((pricing.grand_total - 190.0).abs() < f64::EPSILON);
        assert_eq!(pricing.currency, "INR");
    }

    #[test]
    fn test_pricing_sums_missing_grand_total() {
        let raw = json!({
            "Fruits": {"items": [{"name": "Lemon", "price": 10}], "total_price": 10},
            "Dairy & Proteins": {"items": [{"name": "Paneer", "price": 80.5}]}
        });
        let pricing = PricingDetails::from_agent_value(&raw).unwrap();
        assert!((pricing.grand_total - 90.5).abs() < 1e-9);
        let breakdown = pricing.cost_breakdown();
        assert_eq!(breakdown[0].0, "Dairy & Proteins");
    }

    #[test]
    fn test_pricing_rejects_non_object() {
        assert!(PricingDetails::from_agent_value(&json!([1, 2])).is_err());
        assert!(PricingDetails::from_agent_value(&json!({"Grand_Total": 5})).is_err());
    }

    #[test]
    fn test_normalize_categories() {
        let raw = json!({
            "Groceries": ["rice", " lentils ", 5],
            "Notes": "buy fresh",
            "Fruits": []
        });
        let categories = ShoppingList::normalize_categories(&raw);
        assert_eq!(categories.len(), 2);
        assert_eq!(categories["Groceries"], vec!["rice", "lentils", "5"]);
        assert!(categories["Fruits"].is_empty());
    }
}
