//! Layered configuration.
//!
//! Settings are resolved in three layers (later wins):
//! 1. Compiled defaults ([`Settings::default()`])
//! 2. An optional JSON file, deep-merged over the defaults
//! 3. Environment variables
//!
//! Credentials are only ever read from the environment and are never
//! serialized.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::security::{env_vars, ApiKey};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub providers: ProviderSettings,
    pub retrieval: RetrievalSettings,
    pub routing: RoutingSettings,
    pub logging: LoggingSettings,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8000,
            request_timeout_secs: 300,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub temperature: f64,
    pub max_output_tokens: u32,
    pub request_timeout_secs: u64,
    pub openai: OpenAiSettings,
    pub gemini: GeminiSettings,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_output_tokens: 2000,
            request_timeout_secs: 120,
            openai: OpenAiSettings::default(),
            gemini: GeminiSettings::default(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiSettings {
    pub model: String,
    pub base_url: String,
    #[serde(skip)]
    pub api_key: Option<ApiKey>,
}

impl Default for OpenAiSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o".into(),
            base_url: "https://api.openai.com/v1".into(),
            api_key: None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiSettings {
    pub model: String,
    pub base_url: String,
    #[serde(skip)]
    pub api_key: Option<ApiKey>,
}

impl Default for GeminiSettings {
    fn default() -> Self {
        Self {
            model: "gemini-2.0-flash".into(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".into(),
            api_key: None,
        }
    }
}

/// Which web search backend the context retriever uses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchBackendKind {
    /// Brave when a key is configured, DuckDuckGo otherwise.
    #[default]
    Auto,
    Brave,
    DuckDuckGo,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub enabled: bool,
    pub site_domain: String,
    pub content_selector: String,
    pub max_context_chars: usize,
    pub search_backend: SearchBackendKind,
    #[serde(skip)]
    pub brave_api_key: Option<ApiKey>,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            site_domain: "en.wikivoyage.org".into(),
            content_selector: "#mw-content-text".into(),
            max_context_chars: 6000,
            search_backend: SearchBackendKind::Auto,
            brave_api_key: None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingSettings {
    pub base_url: String,
    pub timeout_secs: u64,
    #[serde(skip)]
    pub api_key: Option<ApiKey>,
}

impl Default for RoutingSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.openrouteservice.org/v2/directions/driving-car/geojson".into(),
            timeout_secs: 10,
            api_key: None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub json: bool,
    /// Per-module level overrides, e.g. `{"itinera_llm": "debug"}`.
    pub module_levels: BTreeMap<String, String>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
            module_levels: BTreeMap::new(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid settings JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Load settings from an optional file with overrides from the process environment.
pub fn load_settings(path: Option<&Path>) -> Result<Settings, SettingsError> {
    load_settings_with(path, |name| std::env::var(name).ok())
}

/// Load settings with an explicit environment lookup.
pub fn load_settings_with(
    path: Option<&Path>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<Settings, SettingsError> {
    let defaults = serde_json::to_value(Settings::default())?;

    let merged = match path {
        Some(path) if path.exists() => {
            debug!(?path, "loading settings from file");
            let content = std::fs::read_to_string(path)?;
            let user: Value = serde_json::from_str(&content)?;
            deep_merge(defaults, user)
        }
        Some(path) => {
            debug!(?path, "settings file not found, using defaults");
            defaults
        }
        None => defaults,
    };

    let mut settings: Settings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings, env);
    Ok(settings)
}

/// Recursive deep merge of two JSON values.
///
/// Objects merge per key, arrays and primitives are replaced, and nulls in
/// `source` are skipped.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = match target_map.remove(&key) {
                    Some(target_val) => deep_merge(target_val, source_val),
                    None => source_val,
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply environment overrides. Invalid values are ignored with a warning.
pub fn apply_env_overrides(settings: &mut Settings, env: impl Fn(&str) -> Option<String>) {
    let read = |name: &str| env(name).filter(|v| !v.trim().is_empty());

    if let Some(v) = read("HOST") {
        settings.server.host = v;
    }
    if let Some(v) = read("PORT").or_else(|| read("LANGGRAPH_PORT")) {
        match v.parse::<u16>() {
            Ok(port) => settings.server.port = port,
            Err(_) => tracing::warn!(value = %v, "invalid port env var, ignoring"),
        }
    }

    if let Some(v) = read("OPENAI_MODEL") {
        settings.providers.openai.model = v;
    }
    if let Some(v) = read("OPENAI_BASE_URL") {
        settings.providers.openai.base_url = v;
    }
    if let Some(v) = read("GEMINI_MODEL") {
        settings.providers.gemini.model = v;
    }
    if let Some(v) = read("GEMINI_BASE_URL") {
        settings.providers.gemini.base_url = v;
    }
    if let Some(key) = read(env_vars::OPENAI_API_KEY).and_then(|v| ApiKey::from_raw(&v)) {
        settings.providers.openai.api_key = Some(key);
    }
    if let Some(key) = read(env_vars::GEMINI_API_KEY).and_then(|v| ApiKey::from_raw(&v)) {
        settings.providers.gemini.api_key = Some(key);
    }

    if let Some(key) = read(env_vars::BRAVE_SEARCH_API_KEY).and_then(|v| ApiKey::from_raw(&v)) {
        settings.retrieval.brave_api_key = Some(key);
    }
    if let Some(v) = read("ITINERA_RAG_ENABLED") {
        match parse_bool(&v) {
            Some(b) => settings.retrieval.enabled = b,
            None => tracing::warn!(value = %v, "invalid boolean env var, ignoring"),
        }
    }

    if let Some(key) = read(env_vars::OPENROUTE_API_KEY)
        .or_else(|| read(env_vars::VITE_OPENROUTE_API_KEY))
        .and_then(|v| ApiKey::from_raw(&v))
    {
        settings.routing.api_key = Some(key);
    }

    if let Some(v) = read("ITINERA_LOG_JSON") {
        if let Some(b) = parse_bool(&v) {
            settings.logging.json = b;
        }
    }
}

/// Accepts (case-insensitive) `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
