//! Energy and protein targets from body metrics (Mifflin–St Jeor).

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Male,
    Female,
}

/// Named activity levels and their TDEE multipliers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ActivityLevel {
    Sedentary,
    Light,
    Moderate,
    Active,
}

impl ActivityLevel {
    pub const ALL: [ActivityLevel; 4] = [
        ActivityLevel::Sedentary,
        ActivityLevel::Light,
        ActivityLevel::Moderate,
        ActivityLevel::Active,
    ];

    /// The level whose multiplier equals `factor`, if any.
    pub fn from_factor(factor: f64) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|level| (level.factor() - factor).abs() < 1e-9)
    }

    pub fn factor(self) -> f64 {
        match self {
            ActivityLevel::Sedentary => 1.2,
            ActivityLevel::Light => 1.375,
            ActivityLevel::Moderate => 1.55,
            ActivityLevel::Active => 1.725,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BodyMetrics {
    pub weight_kg: f64,
    pub height_cm: f64,
    pub age: u32,
    pub sex: Sex,
    pub activity_factor: f64,
    /// Added to maintenance calories; negative to lose weight.
    pub goal_offset: i64,
    /// Grams of protein per kilogram of body weight.
    pub protein_ratio: f64,
}

impl BodyMetrics {
    /// Checks the ranges [`target`] assumes. `target` itself never fails.
    pub fn validate(&self) -> Result<()> {
        if !(30.0..=150.0).contains(&self.weight_kg) {
            return Err(Error::Generic(format!(
                "weight must be 30-150 kg (got {})",
                self.weight_kg
            )));
        }
        if !(100.0..=250.0).contains(&self.height_cm) {
            return Err(Error::Generic(format!(
                "height must be 100-250 cm (got {})",
                self.height_cm
            )));
        }
        if !(10..=100).contains(&self.age) {
            return Err(Error::Generic(format!(
                "age must be 10-100 (got {})",
                self.age
            )));
        }
        if ActivityLevel::from_factor(self.activity_factor).is_none() {
            return Err(Error::Generic(format!(
                "activity factor must be one of 1.2, 1.375, 1.55, 1.725 (got {})",
                self.activity_factor
            )));
        }
        if !(1.0..=3.0).contains(&self.protein_ratio) {
            return Err(Error::Generic(format!(
                "protein ratio must be 1.0-3.0 g/kg (got {})",
                self.protein_ratio
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NutritionTarget {
    pub target_calories: i64,
    pub target_protein_g: i64,
}

pub fn basal_metabolic_rate(metrics: &BodyMetrics) -> f64 {
    let base = 10.0 * metrics.weight_kg + 6.25 * metrics.height_cm - 5.0 * metrics.age as f64;
    match metrics.sex {
        Sex::Male => base + 5.0,
        Sex::Female => base - 161.0,
    }
}

pub fn target(metrics: &BodyMetrics) -> NutritionTarget {
    let bmr = basal_metabolic_rate(metrics);
    NutritionTarget {
        target_calories: (bmr * metrics.activity_factor).round() as i64 + metrics.goal_offset,
        target_protein_g: (metrics.weight_kg * metrics.protein_ratio).round() as i64,
    }
}
