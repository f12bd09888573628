use super::GenerationService;
use crate::error::ProviderError;
use crate::models::MealInput;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Outcome = Result<String, ProviderError>;

/// Scripted [`GenerationService`] keyed by model ID.
///
/// Each model replays its queued outcomes in order and keeps repeating the
/// last one. Models with no script answer `NotFound`. Clones share state, so
/// a clone kept by a test can inspect calls made through the analyzer.
#[derive(Clone, Default)]
pub struct MockGenerationClient {
    scripts: Arc<Mutex<HashMap<String, VecDeque<Outcome>>>>,
    calls: Arc<Mutex<Vec<String>>>,
    delay: Option<Duration>,
}

impl MockGenerationClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(self, model: &str, text: &str) -> Self {
        self.push(model, Ok(text.to_string()))
    }

    pub fn with_failure(self, model: &str, error: ProviderError) -> Self {
        self.push(model, Err(error))
    }

    /// Delays every answer, for timeout and cancellation tests.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn push(self, model: &str, outcome: Outcome) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .entry(model.to_string())
            .or_default()
            .push_back(outcome);
        self
    }

    /// Model IDs called so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn get_call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn next_outcome(&self, model: &str) -> Outcome {
        let mut scripts = self.scripts.lock().unwrap();
        match scripts.get_mut(model) {
            Some(queue) if queue.len() > 1 => queue
                .pop_front()
                .unwrap_or(Err(ProviderError::EmptyResponse)),
            Some(queue) => queue
                .front()
                .cloned()
                .unwrap_or(Err(ProviderError::EmptyResponse)),
            None => Err(ProviderError::NotFound(format!("models/{} is not found", model))),
        }
    }
}

#[async_trait]
impl GenerationService for MockGenerationClient {
    async fn generate(
        &self,
        model: &str,
        _system_instruction: &str,
        _input: &MealInput,
    ) -> Result<String, ProviderError> {
        self.calls.lock().unwrap().push(model.to_string());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.next_outcome(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replays_script_then_repeats_last() {
        let client = MockGenerationClient::new()
            .with_failure("a", ProviderError::Network("reset".to_string()))
            .with_response("a", "[]");
        let input = MealInput::text("tea");

        assert!(client.generate("a", "", &input).await.is_err());
        assert_eq!(client.generate("a", "", &input).await.unwrap(), "[]");
        assert_eq!(client.generate("a", "", &input).await.unwrap(), "[]");
    }

    #[tokio::test]
    async fn test_unknown_model_is_not_found() {
        let client = MockGenerationClient::new();
        let err = client
            .generate("missing", "", &MealInput::text("tea"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_clones_share_call_log() {
        let client = MockGenerationClient::new().with_response("a", "[]");
        let observer = client.clone();

        client.generate("a", "", &MealInput::text("x")).await.unwrap();
        client.generate("b", "", &MealInput::text("x")).await.unwrap_err();

        assert_eq!(observer.calls(), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(observer.get_call_count(), 2);
    }
}
