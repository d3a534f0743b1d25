//! Provider Dispatcher: picks the adapter named by the request and turns
//! every failure into itinerary text.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use itinera_core::errors::GatewayError;
use itinera_core::provider::{GenerationOptions, ProviderKind, TextProvider};
use itinera_core::settings::ProviderSettings;
use itinera_core::state::{PipelineState, StatePatch};
use itinera_llm::{GeminiConfig, GeminiProvider, OpenAiConfig, OpenAiProvider};

pub const AI_ERROR_PREFIX: &str = "Error calling AI service: ";
pub const UNSUPPORTED_PROVIDER_MESSAGE: &str =
    "Unsupported AI provider. Please use 'gpt' or 'gemini'.";

/// The adapters available to the pipeline. An absent slot means the
/// provider's credential was not configured.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    gpt: Option<Arc<dyn TextProvider>>,
    gemini: Option<Arc<dyn TextProvider>>,
    options: GenerationOptions,
}

impl ProviderRegistry {
    pub fn new(options: GenerationOptions) -> Self {
        Self {
            gpt: None,
            gemini: None,
            options,
        }
    }

    pub fn with_provider(mut self, kind: ProviderKind, provider: Arc<dyn TextProvider>) -> Self {
        match kind {
            ProviderKind::Gpt => self.gpt = Some(provider),
            ProviderKind::Gemini => self.gemini = Some(provider),
        }
        self
    }

    /// Construct adapters for every provider whose key is present.
    pub fn from_settings(settings: &ProviderSettings) -> Self {
        let options = GenerationOptions {
            temperature: settings.temperature,
            max_output_tokens: settings.max_output_tokens,
        };
        let timeout = Duration::from_secs(settings.request_timeout_secs);
        let mut registry = Self::new(options);

        match &settings.openai.api_key {
            Some(key) => {
                let config = OpenAiConfig::new(key.clone())
                    .with_model(&settings.openai.model)
                    .with_base_url(&settings.openai.base_url)
                    .with_request_timeout(timeout);
                registry = registry
                    .with_provider(ProviderKind::Gpt, Arc::new(OpenAiProvider::new(config)));
            }
            None => warn!("OPENAI_API_KEY not set, gpt provider unavailable"),
        }

        match &settings.gemini.api_key {
            Some(key) => {
                let config = GeminiConfig::new(key.clone())
                    .with_model(&settings.gemini.model)
                    .with_base_url(&settings.gemini.base_url)
                    .with_request_timeout(timeout);
                registry = registry
                    .with_provider(ProviderKind::Gemini, Arc::new(GeminiProvider::new(config)));
            }
            None => warn!("GEMINI_API_KEY not set, gemini provider unavailable"),
        }

        registry
    }

    pub fn get(&self, kind: ProviderKind) -> Option<&Arc<dyn TextProvider>> {
        match kind {
            ProviderKind::Gpt => self.gpt.as_ref(),
            ProviderKind::Gemini => self.gemini.as_ref(),
        }
    }

    pub fn is_configured(&self, kind: ProviderKind) -> bool {
        self.get(kind).is_some()
    }

    pub fn options(&self) -> &GenerationOptions {
        &self.options
    }

    /// Generate with the given provider, failing if it is not configured.
    pub async fn generate(&self, kind: ProviderKind, prompt: &str) -> Result<String, GatewayError> {
        let provider = self.get(kind).ok_or_else(|| GatewayError::NotConfigured {
            provider: kind.to_string(),
            env_var: kind.credential_env_var(),
        })?;
        provider.generate(prompt, &self.options).await
    }

    /// CallAI stage body. Never fails: errors become itinerary text.
    pub async fn call_ai(&self, state: &PipelineState) -> StatePatch {
        let Some(kind) = ProviderKind::from_key(&state.ai_provider) else {
            debug!(ai_provider = %state.ai_provider, "unsupported provider requested");
            return StatePatch::itinerary(UNSUPPORTED_PROVIDER_MESSAGE);
        };

        match self.generate(kind, state.prompt_or_empty()).await {
            Ok(text) => StatePatch::itinerary(text),
            Err(e) => {
                warn!(provider = %kind, error_kind = e.error_kind(), error = %e, "AI call failed");
                StatePatch::itinerary(format!("{AI_ERROR_PREFIX}{e}"))
            }
        }
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("gpt", &self.gpt.as_ref().map(|p| p.model().to_string()))
            .field("gemini", &self.gemini.as_ref().map(|p| p.model().to_string()))
            .field("options", &self.options)
            .finish()
    }
}
