//! Google Gemini adapter (Generative Language API, API-key auth).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{info, instrument, warn};

use itinera_core::errors::GatewayError;
use itinera_core::provider::{GenerationOptions, TextProvider};
use itinera_core::security::ApiKey;

use crate::http;

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Clone, Debug)]
pub struct GeminiConfig {
    pub api_key: ApiKey,
    pub model: String,
    pub base_url: String,
    pub request_timeout: Duration,
}

impl GeminiConfig {
    pub fn new(api_key: ApiKey) -> Self {
        Self {
            api_key,
            model: DEFAULT_MODEL.into(),
            base_url: DEFAULT_BASE_URL.into(),
            request_timeout: http::DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

pub struct GeminiProvider {
    config: GeminiConfig,
    client: Client,
}

impl GeminiProvider {
    pub fn new(config: GeminiConfig) -> Self {
        info!(model = %config.model, auth_type = "api_key", "Gemini provider initialized");
        let client = http::build_client(config.request_timeout);
        Self { config, client }
    }

    /// The key travels in the `x-goog-api-key` header, never in the URL.
    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            http::trim_base_url(&self.config.base_url),
            self.config.model
        )
    }
}

pub fn build_request_body(prompt: &str, options: &GenerationOptions) -> serde_json::Value {
    serde_json::json!({
        "contents": [{
            "role": "user",
            "parts": [{"text": prompt}],
        }],
        "generationConfig": {
            "temperature": options.temperature,
            "maxOutputTokens": options.max_output_tokens,
        },
    })
}

/// Concatenate the text parts of the first candidate.
///
/// A response without candidates usually means the prompt was blocked; the
/// block reason is surfaced in the error.
pub fn extract_text(body: &serde_json::Value) -> Result<String, GatewayError> {
    let Some(parts) = body["candidates"][0]["content"]["parts"].as_array() else {
        let reason = body["promptFeedback"]["blockReason"]
            .as_str()
            .map(|r| format!("prompt blocked: {r}"))
            .unwrap_or_else(|| "missing candidates[0].content.parts".into());
        return Err(GatewayError::MalformedResponse(reason));
    };

    let text: String = parts.iter().filter_map(|p| p["text"].as_str()).collect();
    if text.is_empty() {
        warn!(
            finish_reason = body["candidates"][0]["finishReason"].as_str().unwrap_or("unknown"),
            "Gemini returned no text parts"
        );
        return Err(GatewayError::MalformedResponse("candidate has no text parts".into()));
    }
    Ok(text)
}

#[async_trait]
impl TextProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    #[instrument(skip(self, prompt, options), fields(model = %self.config.model, prompt_len = prompt.len()))]
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, GatewayError> {
        let body = build_request_body(prompt, options);
        let req = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", self.config.api_key.expose())
            .json(&body);

        let resp = http::send_json(req, self.config.request_timeout).await?;
        extract_text(&resp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider_for(server: &MockServer) -> GeminiProvider {
        let key = ApiKey::from_raw("AIza-test-key").unwrap();
        GeminiProvider::new(GeminiConfig::new(key).with_base_url(server.uri()))
    }

    #[test]
    fn provider_properties() {
        let key = ApiKey::from_raw("AIza-test-key").unwrap();
        let provider = GeminiProvider::new(GeminiConfig::new(key).with_model("gemini-1.5-pro"));
        assert_eq!(provider.name(), "gemini");
        assert_eq!(provider.model(), "gemini-1.5-pro");
        assert_eq!(
            provider.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-pro:generateContent"
        );
    }

    #[test]
    fn request_body_shape() {
        let body = build_request_body("hello", &GenerationOptions::default());
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(body["generationConfig"]["temperature"], 0.7);
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 2000);
        assert!(body.get("systemInstruction").is_none());
    }

    #[test]
    fn extract_concatenates_parts() {
        let body = serde_json::json!({
            "candidates": [{"content": {"parts": [{"text": "Ngày 1"}, {"text": ", Ngày 2"}]}}]
        });
        assert_eq!(extract_text(&body).unwrap(), "Ngày 1, Ngày 2");
    }

    #[test]
    fn extract_reports_block_reason() {
        let body = serde_json::json!({"promptFeedback": {"blockReason": "SAFETY"}});
        let err = extract_text(&body).unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[tokio::test]
    async fn generate_sends_key_and_returns_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-2.0-flash:generateContent"))
            .and(header("x-goog-api-key", "AIza-test-key"))
            .and(body_partial_json(serde_json::json!({
                "generationConfig": {"maxOutputTokens": 2000}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{"content": {"parts": [{"text": "ITINERARY"}]}, "finishReason": "STOP"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let text = provider_for(&server)
            .generate("3 days in Hue", &GenerationOptions::default())
            .await
            .unwrap();
        assert_eq!(text, "ITINERARY");
    }

    #[tokio::test]
    async fn server_error_is_classified() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("internal"))
            .mount(&server)
            .await;

        let err = provider_for(&server)
            .generate("x", &GenerationOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::ServerError { status: 500, .. }));
    }

    #[tokio::test]
    async fn transport_error_does_not_expose_key() {
        let key = ApiKey::from_raw("AIza-SECRET-KEY-123").unwrap();
        let provider = GeminiProvider::new(
            GeminiConfig::new(key)
                .with_base_url("http://127.0.0.1:1")
                .with_request_timeout(Duration::from_secs(2)),
        );

        let err = provider
            .generate("x", &GenerationOptions::default())
            .await
            .unwrap_err();
        assert!(!err.to_string().contains("AIza-SECRET-KEY-123"), "{err}");
        assert!(!err.to_string().contains("127.0.0.1:1/models"), "{err}");
    }
}
