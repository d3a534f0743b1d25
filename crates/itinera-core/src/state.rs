//! Per-request pipeline state and the patches stages produce.

use serde::{Deserialize, Deserializer, Serialize};

pub const DEFAULT_PROVIDER: &str = "gpt";

/// Speaker of a prior chat turn. Anything other than `user`, including a
/// missing role, is read as the assistant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum Role {
    #[serde(rename = "user")]
    User,
    #[default]
    #[serde(rename = "assistant")]
    Assistant,
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(d)?;
        Ok(match raw.as_deref().map(str::trim) {
            Some(role) if role.eq_ignore_ascii_case("user") => Role::User,
            _ => Role::Assistant,
        })
    }
}

/// One prior chat turn supplied by the caller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(default)]
    pub role: Role,
    #[serde(default, deserialize_with = "null_as_empty_string")]
    pub content: String,
}

impl HistoryEntry {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// The record threaded through every stage of one pipeline invocation.
///
/// Fields are only ever added or overwritten via [`PipelineState::apply`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineState {
    pub user_input: String,
    pub ai_provider: String,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub itinerary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
}

impl PipelineState {
    pub fn new(
        user_input: impl Into<String>,
        ai_provider: impl Into<String>,
        history: Vec<HistoryEntry>,
    ) -> Self {
        Self {
            user_input: user_input.into(),
            ai_provider: ai_provider.into(),
            history,
            ..Self::default()
        }
    }

    /// Merge a stage's output. Set fields overwrite, unset fields are kept.
    pub fn apply(&mut self, patch: StatePatch) {
        if let Some(prompt) = patch.prompt {
            self.prompt = Some(prompt);
        }
        if let Some(itinerary) = patch.itinerary {
            self.itinerary = Some(itinerary);
        }
        if let Some(output) = patch.output {
            self.output = Some(output);
        }
        if let Some(success) = patch.success {
            self.success = Some(success);
        }
    }

    pub fn prompt_or_empty(&self) -> &str {
        self.prompt.as_deref().unwrap_or_default()
    }

    pub fn itinerary_or_empty(&self) -> &str {
        self.itinerary.as_deref().unwrap_or_default()
    }
}

/// Partial state produced by one stage.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StatePatch {
    pub prompt: Option<String>,
    pub itinerary: Option<String>,
    pub output: Option<String>,
    pub success: Option<bool>,
}

impl StatePatch {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn prompt(prompt: impl Into<String>) -> Self {
        Self {
            prompt: Some(prompt.into()),
            ..Self::default()
        }
    }

    pub fn itinerary(itinerary: impl Into<String>) -> Self {
        Self {
            itinerary: Some(itinerary.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Request body accepted by the itinerary endpoint.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TravelRequest {
    pub text: String,
    #[serde(default = "default_provider", deserialize_with = "null_as_default_provider")]
    pub ai_provider: String,
    #[serde(default, deserialize_with = "lenient_history")]
    pub history: Vec<HistoryEntry>,
}

impl TravelRequest {
    pub fn new(text: impl Into<String>, ai_provider: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ai_provider: ai_provider.into(),
            history: Vec::new(),
        }
    }

    pub fn with_history(mut self, history: Vec<HistoryEntry>) -> Self {
        self.history = history;
        self
    }

    pub fn into_state(self) -> PipelineState {
        PipelineState::new(self.text, self.ai_provider, self.history)
    }
}

/// Response body returned by the itinerary endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TravelResponse {
    pub output: String,
    pub success: bool,
    pub ai_provider: String,
}

fn default_provider() -> String {
    DEFAULT_PROVIDER.to_string()
}

fn null_as_default_provider<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(d)?.unwrap_or_else(default_provider))
}

/// Accepts `null` or any list; items that are not turn objects are dropped.
fn lenient_history<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<HistoryEntry>, D::Error> {
    let items = Option::<Vec<serde_json::Value>>::deserialize(d)?.unwrap_or_default();
    Ok(items
        .into_iter()
        .filter(serde_json::Value::is_object)
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect())
}

fn null_as_empty_string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(d)?.unwrap_or_default())
}
