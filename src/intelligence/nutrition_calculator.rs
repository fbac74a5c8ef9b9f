// ABOUTME: Nutrition calculation algorithms using peer-reviewed scientific formulas
// ABOUTME: Mifflin-St Jeor BMR, activity-scaled TDEE, goal adjustment, macro split and micronutrient hints
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! Nutrition Calculator Module
//!
//! Deterministic calorie and macronutrient targets from biometrics. The
//! calculation has no error conditions: unrecognised categorical descriptors
//! resolve to an explicit `Unspecified` variant, use the documented default
//! and record a [`CalculatorWarning`].
//!
//! # Scientific References
//!
//! - Mifflin, M.D., et al. (1990). A new predictive equation for resting energy expenditure.
//!   *American Journal of Clinical Nutrition*, 51(2), 241-247.
//!   <https://doi.org/10.1093/ajcn/51.2.241>
//!
//! - `McArdle`, W.D., Katch, F.I., & Katch, V.L. (2010). *Exercise Physiology*.

use crate::config::nutrition::{ActivityFactorsConfig, BmrConfig, GoalMultipliersConfig};
use crate::config::NutritionConfig;
use crate::constants::nutrition::{IRON, OMEGA_3, VITAMIN_B12, VITAMIN_D};
use crate::models::{
    ActivityLevel, CalculatorWarning, DietType, Gender, Goal, NutritionTargets, UserProfile,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Raw calculator inputs, exactly as a user or agent supplied them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutritionInputs {
    /// Age in years
    pub age: u32,
    /// Gender descriptor
    pub gender: String,
    /// Body weight in kilograms
    pub weight_kg: f64,
    /// Height in centimeters
    pub height_cm: f64,
    /// Activity descriptor
    pub activity: String,
    /// Goal descriptor
    pub goal: String,
    /// Diet descriptor (optional)
    #[serde(default)]
    pub diet: String,
}

impl NutritionInputs {
    /// Inputs taken from a stored profile
    #[must_use]
    pub fn from_profile(profile: &UserProfile) -> Self {
        Self {
            age: profile.age,
            gender: profile.gender.clone(),
            weight_kg: profile.weight_kg,
            height_cm: profile.height_cm,
            activity: profile.activity_level.clone(),
            goal: profile.goal.clone(),
            diet: profile.diet_type.clone(),
        }
    }
}

/// Calculate Basal Metabolic Rate using Mifflin-St Jeor equation (1990)
///
/// Formula: BMR = (10 x `weight_kg`) + (6.25 x `height_cm`) - (5 x age) + `gender_offset`
/// - Men: +5
/// - Women and unspecified: -161
///
/// # Reference
/// Mifflin et al. (1990) DOI: 10.1093/ajcn/51.2.241
#[must_use]
pub fn mifflin_st_jeor_bmr(
    weight_kg: f64,
    height_cm: f64,
    age: u32,
    gender: Gender,
    config: &BmrConfig,
) -> f64 {
    let gender_constant = match gender {
        Gender::Male => config.msj_male_constant,
        Gender::Female | Gender::Unspecified => config.msj_female_constant,
    };

    config.msj_weight_coef * weight_kg
        + config.msj_height_coef * height_cm
        + config.msj_age_coef * f64::from(age)
        + gender_constant
}

/// Activity multiplier for TDEE
#[must_use]
pub const fn activity_factor(level: ActivityLevel, config: &ActivityFactorsConfig) -> f64 {
    match level {
        ActivityLevel::Sedentary => config.sedentary,
        ActivityLevel::LightlyActive => config.lightly_active,
        ActivityLevel::ModeratelyActive => config.moderately_active,
        ActivityLevel::VeryActive => config.very_active,
        ActivityLevel::ExtraActive => config.extra_active,
        ActivityLevel::Unspecified => config.unspecified,
    }
}

/// Calorie multiplier applied to TDEE for a goal
#[must_use]
pub const fn goal_multiplier(goal: Goal, config: &GoalMultipliersConfig) -> f64 {
    match goal {
        Goal::WeightLoss => config.weight_loss,
        Goal::MuscleGain => config.muscle_gain,
        Goal::Maintenance | Goal::Unspecified => config.maintenance,
    }
}

/// Micronutrient suggestions, in rule order and without duplicates
///
/// Plant-based diets add B12, Iron and Omega-3; women add Iron; Vitamin D is always added.
#[must_use]
pub fn vitamin_suggestions(diet: DietType, gender: Gender) -> Vec<String> {
    let mut candidates: Vec<&str> = Vec::with_capacity(5);
    if diet.is_plant_based() {
        candidates.extend([VITAMIN_B12, IRON, OMEGA_3]);
    }
    if gender == Gender::Female {
        candidates.push(IRON);
    }
    candidates.push(VITAMIN_D);

    let mut vitamins: Vec<String> = Vec::with_capacity(candidates.len());
    for name in candidates {
        if !vitamins.iter().any(|v| v == name) {
            vitamins.push(name.to_owned());
        }
    }
    vitamins
}

/// Compute daily targets from raw inputs
///
/// Protein is fixed per kilogram, fat takes a fixed share of calories and
/// carbohydrates take the remainder. Grams and calories are rounded to the
/// nearest integer; the protein ratio is not.
#[must_use]
pub fn calculate_nutrition(inputs: &NutritionInputs, config: &NutritionConfig) -> NutritionTargets {
    let gender = Gender::from_descriptor(&inputs.gender);
    let activity_level = ActivityLevel::from_descriptor(&inputs.activity);
    let goal = Goal::from_descriptor(&inputs.goal);
    let diet = DietType::from_descriptor(&inputs.diet);

    let mut warnings = Vec::new();
    if activity_level == ActivityLevel::Unspecified {
        warn!(activity = %inputs.activity, "Unrecognised activity level, using default factor");
        warnings.push(CalculatorWarning::UnrecognizedActivity(
            inputs.activity.clone(),
        ));
    }
    if goal == Goal::Unspecified {
        warn!(goal = %inputs.goal, "Unrecognised goal, using maintenance calories");
        warnings.push(CalculatorWarning::UnrecognizedGoal(inputs.goal.clone()));
    }
    if gender == Gender::Unspecified {
        warn!(gender = %inputs.gender, "Unrecognised gender, using female BMR constant");
        warnings.push(CalculatorWarning::UnrecognizedGender(inputs.gender.clone()));
    }

    let bmr = mifflin_st_jeor_bmr(
        inputs.weight_kg,
        inputs.height_cm,
        inputs.age,
        gender,
        &config.bmr,
    );
    let tdee = bmr * activity_factor(activity_level, &config.activity_factors);
    let target_calories = tdee * goal_multiplier(goal, &config.goals);

    let macros = &config.macronutrients;
    let protein_g = inputs.weight_kg * macros.protein_g_per_kg;
    let protein_cal = protein_g * macros.kcal_per_g_protein;
    let fat_cal = target_calories * macros.fat_calorie_share;
    let fat_g = fat_cal / macros.kcal_per_g_fat;
    let carbs_cal = target_calories - (protein_cal + fat_cal);
    let carbs_g = carbs_cal / macros.kcal_per_g_carbs;

    let calories = target_calories.round_ties_even() as i64;
    let protein_g_rounded = protein_g.round_ties_even() as i64;
    let carbs_g_rounded = carbs_g.round_ties_even() as i64;
    let fat_g_rounded = fat_g.round_ties_even() as i64;

    if target_calories < bmr {
        warnings.push(CalculatorWarning::BelowBmr {
            calories,
            bmr: bmr.round_ties_even() as i64,
        });
    }
    if carbs_g_rounded < 0 {
        warnings.push(CalculatorWarning::NegativeCarbohydrates {
            carbs_g: carbs_g_rounded,
        });
    }

    let analysis = format!(
        "Based on {}y, {}kg, {}cm, {} activity, and goal '{}', daily needs are {} kcal with {}g protein, {}g carbs, and {}g fat.",
        inputs.age,
        inputs.weight_kg,
        inputs.height_cm,
        inputs.activity.trim().to_lowercase(),
        inputs.goal.trim().to_lowercase(),
        calories,
        protein_g_rounded,
        carbs_g_rounded,
        fat_g_rounded,
    );

    NutritionTargets {
        bmr,
        tdee,
        target_calories,
        calories,
        protein_g: protein_g_rounded,
        carbs_g: carbs_g_rounded,
        fat_g: fat_g_rounded,
        protein_g_per_kg: if inputs.weight_kg > 0.0 {
            protein_g / inputs.weight_kg
        } else {
            macros.protein_g_per_kg
        },
        vitamins: vitamin_suggestions(diet, gender),
        activity_level,
        goal,
        diet,
        gender,
        warnings,
        analysis,
    }
}
