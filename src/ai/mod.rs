//! AI service integration for meal analysis
//!
//! Provides the generation seam the analyzer calls, the Gemini REST
//! implementation, and a scripted mock for tests and local harnesses.

pub mod gemini;
pub mod mime;
pub mod mock;

pub use gemini::{GeminiAnalysisClient, GeminiCatalogClient, GeminiHttpClient, ModelInfo};
pub use mock::MockGenerationClient;

use crate::error::ProviderError;
use crate::models::MealInput;
use crate::Result;
use async_trait::async_trait;

/// One remote content-generation call against a named model.
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Returns the model's non-empty answer text, or the classified failure.
    async fn generate(
        &self,
        model: &str,
        system_instruction: &str,
        input: &MealInput,
    ) -> std::result::Result<String, ProviderError>;
}

#[async_trait]
pub trait ModelCatalog: Send + Sync {
    async fn list_models(&self) -> Result<Vec<ModelInfo>>;
}
