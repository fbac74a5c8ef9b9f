// ABOUTME: Nutrition calculation configuration for BMR, activity factors, goals and macros
// ABOUTME: Process-global defaults through a OnceLock, overridable per call
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use crate::constants::nutrition as defaults;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Nutrition calculation configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NutritionConfig {
    /// BMR calculation settings
    pub bmr: BmrConfig,
    /// Activity factor multipliers for TDEE calculation
    pub activity_factors: ActivityFactorsConfig,
    /// Goal calorie multipliers
    pub goals: GoalMultipliersConfig,
    /// Macronutrient split
    pub macronutrients: MacronutrientConfig,
}

/// BMR (Basal Metabolic Rate) calculation configuration
///
/// Reference: Mifflin, M.D., et al. (1990). A new predictive equation for resting energy expenditure.
/// American Journal of Clinical Nutrition, 51(2), 241-247. DOI: 10.1093/ajcn/51.2.241
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BmrConfig {
    /// Mifflin-St Jeor weight coefficient (10.0)
    pub msj_weight_coef: f64,
    /// Mifflin-St Jeor height coefficient (6.25)
    pub msj_height_coef: f64,
    /// Mifflin-St Jeor age coefficient (-5.0)
    pub msj_age_coef: f64,
    /// Mifflin-St Jeor male constant (+5)
    pub msj_male_constant: f64,
    /// Mifflin-St Jeor female constant (-161)
    pub msj_female_constant: f64,
}

impl Default for BmrConfig {
    fn default() -> Self {
        Self {
            msj_weight_coef: defaults::MSJ_WEIGHT_COEF,
            msj_height_coef: defaults::MSJ_HEIGHT_COEF,
            msj_age_coef: defaults::MSJ_AGE_COEF,
            msj_male_constant: defaults::MSJ_MALE_CONSTANT,
            msj_female_constant: defaults::MSJ_FEMALE_CONSTANT,
        }
    }
}

/// Activity factor multipliers for TDEE calculation
///
/// Reference: `McArdle`, W.D., Katch, F.I., & Katch, V.L. (2010). Exercise Physiology
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityFactorsConfig {
    /// Sedentary (little/no exercise): 1.2
    pub sedentary: f64,
    /// Lightly active (1-3 days/week): 1.375
    pub lightly_active: f64,
    /// Moderately active (3-5 days/week): 1.55
    pub moderately_active: f64,
    /// Very active (6-7 days/week): 1.725
    pub very_active: f64,
    /// Extra active (athlete or physical job): 1.9
    pub extra_active: f64,
    /// Used when the descriptor is not recognised: 1.55
    pub unspecified: f64,
}

impl Default for ActivityFactorsConfig {
    fn default() -> Self {
        Self {
            sedentary: defaults::ACTIVITY_SEDENTARY,
            lightly_active: defaults::ACTIVITY_LIGHTLY_ACTIVE,
            moderately_active: defaults::ACTIVITY_MODERATELY_ACTIVE,
            very_active: defaults::ACTIVITY_VERY_ACTIVE,
            extra_active: defaults::ACTIVITY_EXTRA_ACTIVE,
            unspecified: defaults::ACTIVITY_MODERATELY_ACTIVE,
        }
    }
}

/// Calorie multipliers applied to TDEE per goal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalMultipliersConfig {
    /// Weight loss: 0.85
    pub weight_loss: f64,
    /// Muscle gain: 1.15
    pub muscle_gain: f64,
    /// Maintenance and unrecognised goals: 1.0
    pub maintenance: f64,
}

impl Default for GoalMultipliersConfig {
    fn default() -> Self {
        Self {
            weight_loss: defaults::GOAL_WEIGHT_LOSS,
            muscle_gain: defaults::GOAL_MUSCLE_GAIN,
            maintenance: defaults::GOAL_MAINTENANCE,
        }
    }
}

/// Macronutrient split settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MacronutrientConfig {
    /// Protein grams per kg body weight
    pub protein_g_per_kg: f64,
    /// Share of target calories from fat
    pub fat_calorie_share: f64,
    /// kcal per gram of protein
    pub kcal_per_g_protein: f64,
    /// kcal per gram of carbohydrate
    pub kcal_per_g_carbs: f64,
    /// kcal per gram of fat
    pub kcal_per_g_fat: f64,
}

impl Default for MacronutrientConfig {
    fn default() -> Self {
        Self {
            protein_g_per_kg: defaults::PROTEIN_G_PER_KG,
            fat_calorie_share: defaults::FAT_CALORIE_SHARE,
            kcal_per_g_protein: defaults::KCAL_PER_G_PROTEIN,
            kcal_per_g_carbs: defaults::KCAL_PER_G_CARBS,
            kcal_per_g_fat: defaults::KCAL_PER_G_FAT,
        }
    }
}

static NUTRITION_CONFIG: OnceLock<NutritionConfig> = OnceLock::new();

impl NutritionConfig {
    /// Get the global configuration instance
    pub fn global() -> &'static Self {
        NUTRITION_CONFIG.get_or_init(Self::default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_published_values() {
        let config = NutritionConfig::global();
        assert!((config.bmr.msj_male_constant - 5.0).abs() < f64::EPSILON);
        assert!((config.bmr.msj_female_constant + 161.0).abs() < f64::EPSILON);
        assert!((config.activity_factors.unspecified - 1.55).abs() < f64::EPSILON);
        assert!((config.goals.weight_loss - 0.85).abs() < f64::EPSILON);
        assert!((config.macronutrients.fat_calorie_share - 0.25).abs() < f64::EPSILON);
    }
}
