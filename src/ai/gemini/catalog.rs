//! Discovers which models the configured credential can call.
//!
//! Lists every model, keeps the ones that support `generateContent`, and
//! ranks a preferred family (by default `flash`) ahead of the rest.

use super::client::GeminiHttpClient;
use super::types::{ListModelsResponse, ModelEntry};
use crate::ai::{GenerationService, ModelCatalog};
use crate::error::ProviderError;
use crate::models::{MealInput, ModelCandidate};
use crate::prompts;
use crate::Result;
use async_trait::async_trait;

const GENERATE_CONTENT: &str = "generateContent";
const MAX_PAGES: usize = 20;
const CHECK_MESSAGE: &str = "Hello";

/// A model as reported by `models.list`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelInfo {
    pub id: String,
    pub display_name: Option<String>,
    pub supports_generate_content: bool,
}

impl From<ModelEntry> for ModelInfo {
    fn from(entry: ModelEntry) -> Self {
        let id = entry
            .name
            .strip_prefix("models/")
            .unwrap_or(&entry.name)
            .to_string();
        Self {
            id,
            display_name: entry.display_name,
            supports_generate_content: entry
                .supported_generation_methods
                .iter()
                .any(|m| m == GENERATE_CONTENT),
        }
    }
}

/// Gemini implementation of [`ModelCatalog`].
pub struct GeminiCatalogClient {
    http: GeminiHttpClient,
}

impl GeminiCatalogClient {
    pub fn from_http(http: GeminiHttpClient) -> Self {
        Self { http }
    }
}

#[async_trait]
impl ModelCatalog for GeminiCatalogClient {
    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let mut models = Vec::new();
        let mut page_token: Option<String> = None;

        for _ in 0..MAX_PAGES {
            let page: ListModelsResponse =
                self.http.list_models_page(page_token.as_deref()).await?;
            models.extend(page.models.into_iter().map(ModelInfo::from));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        tracing::info!("Gemini reported {} models", models.len());
        Ok(models)
    }
}

/// Keeps generation-capable models, preferred family first, order otherwise kept.
pub fn rank_candidates(models: &[ModelInfo], preferred: &str) -> Vec<ModelCandidate> {
    let usable: Vec<&ModelInfo> = models
        .iter()
        .filter(|m| m.supports_generate_content)
        .collect();

    let (mut ranked, rest): (Vec<&ModelInfo>, Vec<&ModelInfo>) = usable
        .into_iter()
        .partition(|m| !preferred.is_empty() && m.id.contains(preferred));
    ranked.extend(rest);

    ranked
        .into_iter()
        .map(|m| ModelCandidate::new(&m.id, true))
        .collect()
}

/// Sends one short greeting to `model` and returns its reply.
pub async fn check_model(
    generator: &dyn GenerationService,
    model: &str,
) -> std::result::Result<String, ProviderError> {
    tracing::info!("Sending check call to {}", model);
    generator
        .generate(model, prompts::MODEL_CHECK, &MealInput::text(CHECK_MESSAGE))
        .await
}
