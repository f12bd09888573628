use super::client::GeminiHttpClient;
use super::types::{Content, GenerateContentResponse, InlineData, Part};
use crate::ai::GenerationService;
use crate::error::ProviderError;
use crate::models::MealInput;
use crate::prompts;
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Serialize)]
struct AnalysisRequest {
    system_instruction: Content,
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: AnalysisGenerationConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalysisGenerationConfig {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

/// Gemini implementation of [`GenerationService`].
pub struct GeminiAnalysisClient {
    http: GeminiHttpClient,
}

impl GeminiAnalysisClient {
    pub fn new(api_key: String, timeout: Duration) -> Self {
        Self::from_http(GeminiHttpClient::new(api_key, timeout))
    }

    pub fn from_http(http: GeminiHttpClient) -> Self {
        Self { http }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.http = self.http.with_base_url(base_url);
        self
    }

    fn user_parts(input: &MealInput) -> Vec<Part> {
        match input {
            MealInput::Text(description) => vec![Part::Text {
                text: prompts::render(prompts::ANALYSIS_USER, &[("meal", description)]),
            }],
            MealInput::Image { bytes, mime_type } => {
                use base64::Engine as _;
                vec![
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: mime_type.clone(),
                            data: base64::engine::general_purpose::STANDARD.encode(bytes),
                        },
                    },
                    Part::Text {
                        text: prompts::ANALYSIS_IMAGE.to_string(),
                    },
                ]
            }
        }
    }

    /// Joins the text parts of the first candidate.
    fn extract_text(response: &GenerateContentResponse) -> Option<String> {
        let content = response.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| match p {
                Part::Text { text } => Some(text.as_str()),
                Part::InlineData { .. } => None,
            })
            .collect();

        let text = text.trim();
        if text.is_empty() {
            None
        } else {
            Some(text.to_string())
        }
    }
}

#[async_trait]
impl GenerationService for GeminiAnalysisClient {
    async fn generate(
        &self,
        model: &str,
        system_instruction: &str,
        input: &MealInput,
    ) -> Result<String, ProviderError> {
        let request = AnalysisRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part::Text {
                    text: system_instruction.to_string(),
                }],
            },
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: Self::user_parts(input),
            }],
            generation_config: AnalysisGenerationConfig {
                temperature: 0.2,
                max_output_tokens: Some(2048),
            },
        };

        tracing::debug!("Sending {:?} analysis request to {}", input.modality(), model);

        let response: GenerateContentResponse = self.http.generate_content(model, &request).await?;

        Self::extract_text(&response).ok_or_else(|| {
            let reason = response
                .candidates
                .first()
                .and_then(|c| c.finish_reason.clone())
                .unwrap_or_else(|| "no candidates".to_string());
            tracing::warn!("Gemini model {} returned no text ({})", model, reason);
            ProviderError::EmptyResponse
        })
    }
}
