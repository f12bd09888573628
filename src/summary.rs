//! Daily and weekly totals of logged records against a nutrition target.

use crate::models::NutritionRecord;
use crate::nutrition::NutritionTarget;
use chrono::{Duration, NaiveDate};
use serde::Serialize;

/// A confirmed record as the persistence collaborator hands it back.
#[derive(Debug, Clone)]
pub struct MealEntry {
    pub date: NaiveDate,
    pub record: NutritionRecord,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NutritionTotals {
    pub calories: f64,
    pub protein_g: f64,
    pub fat_g: f64,
    pub carbs_g: f64,
    pub items: usize,
}

impl NutritionTotals {
    pub fn add(&mut self, record: &NutritionRecord) {
        self.calories += record.calories();
        self.protein_g += record.protein_g();
        self.fat_g += record.fat_g();
        self.carbs_g += record.carbs_g();
        self.items += 1;
    }

    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a NutritionRecord>) -> Self {
        let mut totals = Self::default();
        for record in records {
            totals.add(record);
        }
        totals
    }
}

pub fn daily_totals(entries: &[MealEntry], date: NaiveDate) -> NutritionTotals {
    NutritionTotals::from_records(
        entries
            .iter()
            .filter(|e| e.date == date)
            .map(|e| &e.record),
    )
}

/// Totals for the seven days ending at `end` (inclusive), oldest first.
pub fn weekly_totals(entries: &[MealEntry], end: NaiveDate) -> Vec<(NaiveDate, NutritionTotals)> {
    (0..7)
        .rev()
        .map(|offset| {
            let day = end - Duration::days(offset);
            (day, daily_totals(entries, day))
        })
        .collect()
}

/// Mean daily calories over the days that have at least one record.
pub fn average_logged_calories(week: &[(NaiveDate, NutritionTotals)]) -> Option<f64> {
    let logged: Vec<f64> = week
        .iter()
        .filter(|(_, totals)| totals.items > 0)
        .map(|(_, totals)| totals.calories)
        .collect();

    if logged.is_empty() {
        return None;
    }
    Some(logged.iter().sum::<f64>() / logged.len() as f64)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Progress {
    /// Negative once the target is exceeded.
    pub remaining_calories: i64,
    pub remaining_protein_g: i64,
    pub calorie_ratio: f64,
}

pub fn progress(totals: &NutritionTotals, target: &NutritionTarget) -> Progress {
    let calorie_ratio = if target.target_calories > 0 {
        totals.calories / target.target_calories as f64
    } else {
        0.0
    };

    Progress {
        remaining_calories: target.target_calories - totals.calories.round() as i64,
        remaining_protein_g: target.target_protein_g - totals.protein_g.round() as i64,
        calorie_ratio,
    }
}
