//! Data models and structures
//!
//! Defines meal inputs, model candidates, validated nutrition records and the
//! environment-driven configuration.

use crate::ai::mime::detect_image_mime;
use crate::{Error, Result};
use serde::Serialize;
use std::path::Path;
use std::time::Duration;

/// Kind of input a model endpoint is asked to understand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modality {
    Text,
    Image,
}

/// A meal description supplied by the user for one analysis request.
#[derive(Debug, Clone, PartialEq)]
pub enum MealInput {
    Text(String),
    Image { bytes: Vec<u8>, mime_type: String },
}

impl MealInput {
    pub fn text(description: impl Into<String>) -> Self {
        MealInput::Text(description.into())
    }

    /// Wraps raw image bytes, detecting the MIME type from magic bytes.
    pub fn image(bytes: Vec<u8>) -> Self {
        let mime_type = detect_image_mime(&bytes).to_string();
        MealInput::Image { bytes, mime_type }
    }

    pub fn image_from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        if bytes.is_empty() {
            return Err(Error::Generic(format!(
                "Image file is empty: {}",
                path.display()
            )));
        }
        Ok(Self::image(bytes))
    }

    pub fn modality(&self) -> Modality {
        match self {
            MealInput::Text(_) => Modality::Text,
            MealInput::Image { .. } => Modality::Image,
        }
    }
}

/// One model endpoint the analyzer may call, in ranked configuration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelCandidate {
    pub id: String,
    pub supports_images: bool,
}

impl ModelCandidate {
    /// Builds a candidate from a bare model id; a `models/` prefix is stripped.
    pub fn new(id: &str, supports_images: bool) -> Self {
        let id = id.trim();
        let id = id.strip_prefix("models/").unwrap_or(id);
        Self {
            id: id.to_string(),
            supports_images,
        }
    }

    pub fn supports(&self, modality: Modality) -> bool {
        match modality {
            Modality::Text => true,
            Modality::Image => self.supports_images,
        }
    }
}

/// A validated food item with energy consistent with its macros.
///
/// Only produced by [`crate::normalize::normalize`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NutritionRecord {
    food_name: String,
    calories: f64,
    protein_g: f64,
    fat_g: f64,
    carbs_g: f64,
}

impl NutritionRecord {
    pub(crate) fn new(
        food_name: String,
        calories: f64,
        protein_g: f64,
        fat_g: f64,
        carbs_g: f64,
    ) -> Self {
        Self {
            food_name,
            calories,
            protein_g,
            fat_g,
            carbs_g,
        }
    }

    pub fn food_name(&self) -> &str {
        &self.food_name
    }

    pub fn calories(&self) -> f64 {
        self.calories
    }

    pub fn protein_g(&self) -> f64 {
        self.protein_g
    }

    pub fn fat_g(&self) -> f64 {
        self.fat_g
    }

    pub fn carbs_g(&self) -> f64 {
        self.carbs_g
    }
}

// Configuration
const DEFAULT_MODELS: &str =
    "gemini-2.5-flash,gemini-2.5-flash-lite,gemini-2.0-flash,gemini-2.0-flash-lite";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_ATTEMPTS: usize = 6;
const DEFAULT_RETRY_DELAY_MS: u64 = 0;

#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: String,
    pub gemini_base_url: Option<String>,
    pub candidates: Vec<ModelCandidate>,
    pub request_timeout: Duration,
    pub max_attempts: usize,
    pub retry_delay: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let gemini_api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| Error::Config("GEMINI_API_KEY not set".to_string()))?;

        let models = std::env::var("GEMINI_MODELS").unwrap_or_else(|_| DEFAULT_MODELS.to_string());
        let text_only = std::env::var("GEMINI_TEXT_ONLY_MODELS").unwrap_or_default();

        let request_timeout_secs =
            parse_env_number("REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS)?;
        let max_attempts = parse_env_number("MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS)?;
        let retry_delay_ms = parse_env_number("RETRY_DELAY_MS", DEFAULT_RETRY_DELAY_MS)?;

        if max_attempts == 0 {
            return Err(Error::Config("MAX_ATTEMPTS must be at least 1".to_string()));
        }

        Ok(Self {
            gemini_api_key,
            gemini_base_url: std::env::var("GEMINI_BASE_URL").ok(),
            candidates: parse_candidates(&models, &text_only)?,
            request_timeout: Duration::from_secs(request_timeout_secs),
            max_attempts,
            retry_delay: Duration::from_millis(retry_delay_ms),
        })
    }
}

fn parse_env_number<T: std::str::FromStr>(name: &str, default: T) -> Result<T> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("{} is not a valid number: '{}'", name, raw))),
        Err(_) => Ok(default),
    }
}

/// Parses a comma-separated ranked model list, flagging text-only entries.
pub fn parse_candidates(models: &str, text_only: &str) -> Result<Vec<ModelCandidate>> {
    let text_only: Vec<&str> = text_only
        .split(',')
        .map(|m| m.trim())
        .map(|m| m.strip_prefix("models/").unwrap_or(m))
        .filter(|m| !m.is_empty())
        .collect();

    let mut candidates: Vec<ModelCandidate> = Vec::new();
    for entry in models.split(',').filter(|m| !m.trim().is_empty()) {
        let mut candidate = ModelCandidate::new(entry, true);
        if candidates.iter().any(|c| c.id == candidate.id) {
            continue;
        }
        candidate.supports_images = !text_only.contains(&candidate.id.as_str());
        candidates.push(candidate);
    }

    if candidates.is_empty() {
        return Err(Error::Config(
            "GEMINI_MODELS must name at least one model".to_string(),
        ));
    }

    Ok(candidates)
}
