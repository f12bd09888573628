//! Meal analyzer - estimates calories and macros for logged meals
//!
//! A meal description or photo is sent to a generative model, the reply is
//! parsed and validated into nutrition records, and model failures are
//! absorbed by falling back across a ranked list of endpoints.

pub mod ai;
pub mod analyzer;
pub mod error;
pub mod extract;
pub mod models;
pub mod normalize;
pub mod nutrition;
pub mod prompts;
pub mod selector;
pub mod summary;

pub use analyzer::{AnalysisResult, Analyzer, AnalyzerSettings};
pub use error::{Error, Result};
pub use models::{MealInput, ModelCandidate, NutritionRecord};
pub use selector::{ModelChoice, ModelSelector};
