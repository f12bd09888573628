//! Drives one meal analysis across the ranked model candidates.

use crate::ai::{GeminiAnalysisClient, GeminiHttpClient, GenerationService};
use crate::error::{AnalysisError, ProviderError};
use crate::extract::extract;
use crate::models::{Config, MealInput, Modality, NutritionRecord};
use crate::normalize::normalize_batch;
use crate::prompts;
use crate::selector::{ModelChoice, ModelSelector, SelectionRound};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_retry::{strategy::FixedInterval, RetryIf};
use tracing::{error, info, warn, Instrument};
use uuid::Uuid;

pub type AnalysisResult = std::result::Result<Vec<NutritionRecord>, AnalysisError>;

/// Extra attempts against the same model after a transient failure.
const RETRIES_PER_CANDIDATE: usize = 1;

#[derive(Debug, Clone)]
pub struct AnalyzerSettings {
    /// Upper bound on remote calls per request, across all candidates.
    pub max_attempts: usize,
    pub request_timeout: Duration,
    pub retry_delay: Duration,
}

impl Default for AnalyzerSettings {
    fn default() -> Self {
        Self {
            max_attempts: 6,
            request_timeout: Duration::from_secs(30),
            retry_delay: Duration::ZERO,
        }
    }
}

impl From<&Config> for AnalyzerSettings {
    fn from(config: &Config) -> Self {
        Self {
            max_attempts: config.max_attempts,
            request_timeout: config.request_timeout,
            retry_delay: config.retry_delay,
        }
    }
}

/// Entry point of the analysis pipeline.
///
/// Safe to share across tasks; the only mutable state is the selector's
/// [`ModelChoice`].
pub struct Analyzer {
    generator: Box<dyn GenerationService>,
    selector: ModelSelector,
    settings: AnalyzerSettings,
}

impl Analyzer {
    pub fn new(
        generator: Box<dyn GenerationService>,
        selector: ModelSelector,
        settings: AnalyzerSettings,
    ) -> Self {
        Self {
            generator,
            selector,
            settings,
        }
    }

    /// Builds a Gemini-backed analyzer from environment configuration.
    pub fn from_config(config: &Config, choice: Arc<ModelChoice>) -> Self {
        let mut http = GeminiHttpClient::new(config.gemini_api_key.clone(), config.request_timeout);
        if let Some(base_url) = &config.gemini_base_url {
            http = http.with_base_url(base_url.clone());
        }

        info!(
            "Analyzer candidates: {}",
            config
                .candidates
                .iter()
                .map(|c| c.id.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );

        Self::new(
            Box::new(GeminiAnalysisClient::from_http(http)),
            ModelSelector::new(config.candidates.clone(), choice),
            AnalyzerSettings::from(config),
        )
    }

    pub fn selector(&self) -> &ModelSelector {
        &self.selector
    }

    /// Estimates nutrition records for one meal.
    ///
    /// Returns either at least one validated record or a terminal error;
    /// transient provider failures only show up as extra latency.
    pub async fn analyze(&self, input: &MealInput) -> AnalysisResult {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("analyze", %request_id, modality = ?input.modality());
        self.run(input).instrument(span).await
    }

    async fn run(&self, input: &MealInput) -> AnalysisResult {
        let modality = input.modality();
        let choice = self.selector.choice();
        let mut round = SelectionRound::new();
        let calls = AtomicUsize::new(0);

        while calls.load(Ordering::SeqCst) < self.settings.max_attempts {
            let Some(candidate) = self.selector.select(&round, modality) else {
                break;
            };
            round.mark_tried(&candidate.id);
            let model = candidate.id.as_str();

            match self.call_with_retry(model, input, &calls).await {
                Ok(raw) => match Self::parse_records(model, &raw) {
                    Some(records) => {
                        choice.record_success(model);
                        info!("Model {} produced {} records", model, records.len());
                        return Ok(records);
                    }
                    None => {
                        choice.invalidate(model);
                    }
                },
                Err(ProviderError::Authentication(message)) => {
                    error!("Model {} rejected the credential: {}", model, message);
                    choice.invalidate(model);
                    return Err(AnalysisError::Authentication(message));
                }
                Err(ProviderError::NotFound(message)) => {
                    warn!("Model {} does not exist, retiring it: {}", model, message);
                    choice.retire(model);
                }
                Err(ProviderError::UnsupportedModality(message)) if modality == Modality::Image => {
                    warn!("Model {} rejected image input: {}", model, message);
                    choice.mark_text_only(model);
                }
                Err(ProviderError::RateLimited(message)) => {
                    warn!("Model {} is rate limited, moving on: {}", model, message);
                    choice.invalidate(model);
                }
                Err(e) => {
                    warn!("Model {} failed: {}", model, e);
                    choice.invalidate(model);
                }
            }
        }

        let attempts = calls.load(Ordering::SeqCst);
        error!("No model produced a usable answer after {} calls", attempts);
        Err(AnalysisError::Exhausted { attempts })
    }

    /// One call plus a bounded retry for transient failures.
    async fn call_with_retry(
        &self,
        model: &str,
        input: &MealInput,
        calls: &AtomicUsize,
    ) -> Result<String, ProviderError> {
        let max_attempts = self.settings.max_attempts;
        let strategy = FixedInterval::new(self.settings.retry_delay).take(RETRIES_PER_CANDIDATE);

        RetryIf::spawn(
            strategy,
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                self.call_once(model, input)
            },
            |e: &ProviderError| {
                let retry = e.is_transient() && calls.load(Ordering::SeqCst) < max_attempts;
                if retry {
                    warn!("Transient failure from {}: {}. Retrying", model, e);
                }
                retry
            },
        )
        .await
    }

    async fn call_once(&self, model: &str, input: &MealInput) -> Result<String, ProviderError> {
        info!("Calling model {}", model);

        let call = self
            .generator
            .generate(model, prompts::ANALYSIS_SYSTEM, input);

        match tokio::time::timeout(self.settings.request_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Network(format!(
                "no answer within {:?}",
                self.settings.request_timeout
            ))),
        }
    }

    fn parse_records(model: &str, raw: &str) -> Option<Vec<NutritionRecord>> {
        let items = match extract(raw) {
            Ok(items) => items,
            Err(e) => {
                warn!("Could not extract records from {} output: {}", model, e);
                return None;
            }
        };

        let records = normalize_batch(&items);
        if records.is_empty() {
            warn!(
                "None of the {} items from {} passed validation",
                items.len(),
                model
            );
            return None;
        }
        Some(records)
    }
}
