use super::types::ApiErrorEnvelope;
use crate::error::ProviderError;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Lightweight Gemini REST client shared by the analysis and catalog modules.
///
/// Unlike a per-model client, the model ID is supplied with every call so one
/// connection pool serves the whole candidate list.
#[derive(Clone)]
pub struct GeminiHttpClient {
    client: Client,
    api_key: String,
    base_url: String,
    timeout: Duration,
}

impl GeminiHttpClient {
    pub fn new(api_key: String, timeout: Duration) -> Self {
        Self::new_with_client(api_key, timeout, Client::new())
    }

    pub fn new_with_client(api_key: String, timeout: Duration, client: Client) -> Self {
        Self {
            client,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout,
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Calls `generateContent` on `model`, given as a bare model ID.
    pub async fn generate_content<Req: Serialize, Resp: DeserializeOwned>(
        &self,
        model: &str,
        request: &Req,
    ) -> Result<Resp, ProviderError> {
        let model = model.strip_prefix("models/").unwrap_or(model);
        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, model);

        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("Failed to send request to Gemini model {}: {}", model, e);
                ProviderError::from(e)
            })?;

        Self::read_json(response).await
    }

    /// Fetches one page of `models.list`.
    pub async fn list_models_page<Resp: DeserializeOwned>(
        &self,
        page_token: Option<&str>,
    ) -> Result<Resp, ProviderError> {
        let url = format!("{}/v1beta/models", self.base_url);
        let mut query = vec![("pageSize", "1000")];
        if let Some(token) = page_token {
            query.push(("pageToken", token));
        }

        let response = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .header("x-goog-api-key", &self.api_key)
            .query(&query)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to list Gemini models: {}", e);
                ProviderError::from(e)
            })?;

        Self::read_json(response).await
    }

    async fn read_json<Resp: DeserializeOwned>(response: Response) -> Result<Resp, ProviderError> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::warn!("Gemini API error (status {}): {}", status, body);
            return Err(classify_failure(status, &body));
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!("Failed to parse Gemini response: {}\nBody: {}", e, body);
            ProviderError::Malformed(format!("Failed to parse Gemini response: {}", e))
        })
    }
}

/// Maps a non-2xx Gemini reply onto the provider error taxonomy.
pub fn classify_failure(status: StatusCode, body: &str) -> ProviderError {
    let (message, api_status) = match serde_json::from_str::<ApiErrorEnvelope>(body) {
        Ok(envelope) => (envelope.error.message, envelope.error.status),
        Err(_) => (body.trim().to_string(), String::new()),
    };
    let lower = body.to_lowercase();

    match status {
        StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited(message),
        StatusCode::NOT_FOUND => ProviderError::NotFound(message),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::Authentication(message),
        StatusCode::BAD_REQUEST
            if lower.contains("api_key_invalid") || lower.contains("api key not valid") =>
        {
            ProviderError::Authentication(message)
        }
        StatusCode::BAD_REQUEST if mentions_unsupported_image(&lower) => {
            ProviderError::UnsupportedModality(message)
        }
        _ if api_status == "RESOURCE_EXHAUSTED" => ProviderError::RateLimited(message),
        _ => ProviderError::Api {
            status: status.as_u16(),
            message,
        },
    }
}

fn mentions_unsupported_image(lower: &str) -> bool {
    lower.contains("modality")
        || lower.contains("image input")
        || (lower.contains("image") && lower.contains("not supported"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope(code: u16, status: &str, message: &str) -> String {
        json!({"error": {"code": code, "status": status, "message": message}}).to_string()
    }

    #[test]
    fn test_classifies_rate_limit() {
        let err = classify_failure(
            StatusCode::TOO_MANY_REQUESTS,
            &envelope(429, "RESOURCE_EXHAUSTED", "Quota exceeded"),
        );
        assert_eq!(err, ProviderError::RateLimited("Quota exceeded".to_string()));
    }

    #[test]
    fn test_classifies_not_found() {
        let err = classify_failure(
            StatusCode::NOT_FOUND,
            &envelope(404, "NOT_FOUND", "models/gemini-1.0-pro is not found"),
        );
        assert!(matches!(err, ProviderError::NotFound(_)));
    }

    #[test]
    fn test_classifies_invalid_api_key() {
        let body = json!({"error": {
            "code": 400,
            "status": "INVALID_ARGUMENT",
            "message": "API key not valid. Please pass a valid API key.",
            "details": [{"reason": "API_KEY_INVALID"}]
        }})
        .to_string();

        let err = classify_failure(StatusCode::BAD_REQUEST, &body);
        assert!(matches!(err, ProviderError::Authentication(_)));
        assert!(matches!(
            classify_failure(StatusCode::FORBIDDEN, "denied"),
            ProviderError::Authentication(_)
        ));
    }

    #[test]
    fn test_classifies_unsupported_image_input() {
        let err = classify_failure(
            StatusCode::BAD_REQUEST,
            &envelope(400, "INVALID_ARGUMENT", "Image input modality is not enabled for this model"),
        );
        assert!(matches!(err, ProviderError::UnsupportedModality(_)));
    }

    #[test]
    fn test_other_statuses_keep_raw_message() {
        let err = classify_failure(StatusCode::SERVICE_UNAVAILABLE, "upstream overloaded");
        assert_eq!(
            err,
            ProviderError::Api {
                status: 503,
                message: "upstream overloaded".to_string()
            }
        );
    }
}
