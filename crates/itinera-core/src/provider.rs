use async_trait::async_trait;

use crate::errors::GatewayError;

/// Sampling parameters sent with every generation request.
#[derive(Clone, Debug, PartialEq)]
pub struct GenerationOptions {
    pub temperature: f64,
    pub max_output_tokens: u32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_output_tokens: 2000,
        }
    }
}

/// The two interchangeable backends a request can select.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Gpt,
    Gemini,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 2] = [ProviderKind::Gpt, ProviderKind::Gemini];

    /// Parse a request key, ignoring case. Unknown keys yield `None`.
    pub fn from_key(key: &str) -> Option<Self> {
        match key.trim().to_ascii_lowercase().as_str() {
            "gpt" => Some(Self::Gpt),
            "gemini" => Some(Self::Gemini),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gpt => "gpt",
            Self::Gemini => "gemini",
        }
    }

    /// Environment variable holding this provider's credential.
    pub fn credential_env_var(self) -> &'static str {
        match self {
            Self::Gpt => crate::security::env_vars::OPENAI_API_KEY,
            Self::Gemini => crate::security::env_vars::GEMINI_API_KEY,
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trait implemented by each hosted text-generation adapter.
///
/// One call sends the whole prompt as a single user-role message and returns
/// the generated text.
#[async_trait]
pub trait TextProvider: Send + Sync {
    fn name(&self) -> &str;
    fn model(&self) -> &str;

    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, GatewayError>;
}
