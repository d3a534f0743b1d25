//! OpenAI Chat Completions adapter.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{info, instrument};

use itinera_core::errors::GatewayError;
use itinera_core::provider::{GenerationOptions, TextProvider};
use itinera_core::security::ApiKey;

use crate::http;

pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Clone, Debug)]
pub struct OpenAiConfig {
    pub api_key: ApiKey,
    pub model: String,
    pub base_url: String,
    pub request_timeout: Duration,
}

impl OpenAiConfig {
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

pub struct OpenAiProvider {
    config: OpenAiConfig,
    client: Client,
}

impl OpenAiProvider {
    pub fn new(config: OpenAiConfig) -> Self {
        info!(model = %config.model, "OpenAI provider initialized");
        let client = http::build_client(config.request_timeout);
        Self { config, client }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", http::trim_base_url(&self.config.base_url))
    }
}

/// Build the Chat Completions body: one user message, no system prompt.
pub fn build_request_body(model: &str, prompt: &str, options: &GenerationOptions) -> serde_json::Value {
    serde_json::json!({
        "model": model,
        "messages": [{"role": "user", "content": prompt}],
        "temperature": options.temperature,
        "max_tokens": options.max_output_tokens,
    })
}

/// Pull `choices[0].message.content` out of a completion response.
pub fn extract_text(body: &serde_json::Value) -> Result<String, GatewayError> {
    body["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| {
            GatewayError::MalformedResponse("missing choices[0].message.content".into())
        })
}

#[async_trait]
impl TextProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
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
        let body = build_request_body(&self.config.model, prompt, options);
        let req = self
            .client
            .post(self.endpoint())
            .bearer_auth(self.config.api_key.expose())
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

    fn provider_for(server: &MockServer) -> OpenAiProvider {
        let key = ApiKey::from_raw("sk-test").unwrap();
        OpenAiProvider::new(OpenAiConfig::new(key).with_base_url(server.uri()))
    }

    #[test]
    fn provider_properties() {
        let key = ApiKey::from_raw("sk-test").unwrap();
        let provider = OpenAiProvider::new(OpenAiConfig::new(key));
        assert_eq!(provider.name(), "openai");
        assert_eq!(provider.model(), "gpt-4o");
        assert_eq!(provider.endpoint(), "https://api.openai.com/v1/chat/completions");
    }

    #[test]
    fn request_body_shape() {
        let body = build_request_body("gpt-4o", "plan a trip", &GenerationOptions::default());
        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "plan a trip");
        assert_eq!(body["temperature"], 0.7);
        assert_eq!(body["max_tokens"], 2000);
    }

    #[tokio::test]
    async fn returns_message_content_verbatim() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(serde_json::json!({"model": "gpt-4o"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "Ngày 1: Hồ Xuân Hương"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let text = provider_for(&server)
            .generate("3 ngày ở Đà Lạt", &GenerationOptions::default())
            .await
            .unwrap();
        assert_eq!(text, "Ngày 1: Hồ Xuân Hương");
    }

    #[tokio::test]
    async fn unauthorized_maps_to_auth_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Incorrect API key"))
            .mount(&server)
            .await;

        let err = provider_for(&server)
            .generate("x", &GenerationOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::AuthenticationFailed(ref b) if b.contains("Incorrect")));
    }

    #[tokio::test]
    async fn missing_content_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})))
            .mount(&server)
            .await;

        let err = provider_for(&server)
            .generate("x", &GenerationOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::MalformedResponse(_)));
    }
}
