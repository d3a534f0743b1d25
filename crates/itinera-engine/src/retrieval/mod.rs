//! Retrieval-augmented context: find the destination's travel-wiki page and
//! pull its main text into the prompt.

pub mod destination;
pub mod extract;
pub mod search;

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use itinera_core::settings::{RetrievalSettings, SearchBackendKind};
use itinera_core::text::truncate_chars;

use crate::error::RetrievalError;

pub use destination::extract_destination;
pub use search::{BraveSearch, DuckDuckGoSearch, SearchBackend, SearchHit};

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, Debug)]
pub struct RetrievalConfig {
    pub site_domain: String,
    pub content_selector: String,
    pub max_context_chars: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        let defaults = RetrievalSettings::default();
        Self {
            site_domain: defaults.site_domain,
            content_selector: defaults.content_selector,
            max_context_chars: defaults.max_context_chars,
        }
    }
}

impl From<&RetrievalSettings> for RetrievalConfig {
    fn from(settings: &RetrievalSettings) -> Self {
        Self {
            site_domain: settings.site_domain.clone(),
            content_selector: settings.content_selector.clone(),
            max_context_chars: settings.max_context_chars,
        }
    }
}

/// Search plus page fetch for one destination. Cheap to share behind an `Arc`.
pub struct ContextRetriever {
    search: Arc<dyn SearchBackend>,
    client: reqwest::Client,
    config: RetrievalConfig,
}

impl ContextRetriever {
    pub fn new(search: Arc<dyn SearchBackend>, config: RetrievalConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .user_agent("Mozilla/5.0 (compatible; itinera/0.1)")
            .build()
            .unwrap_or_default();
        Self {
            search,
            client,
            config,
        }
    }

    /// Brave when a key is present (unless DuckDuckGo is forced), otherwise DuckDuckGo.
    pub fn from_settings(settings: &RetrievalSettings) -> Self {
        let search: Arc<dyn SearchBackend> = match (&settings.search_backend, &settings.brave_api_key) {
            (SearchBackendKind::Auto | SearchBackendKind::Brave, Some(key)) => {
                Arc::new(BraveSearch::new(key.clone()))
            }
            (SearchBackendKind::Brave, None) => {
                warn!("brave search requested but BRAVE_SEARCH_API_KEY not set, using duckduckgo");
                Arc::new(DuckDuckGoSearch::new())
            }
            _ => Arc::new(DuckDuckGoSearch::new()),
        };
        info!(
            backend = search.name(),
            domain = %settings.site_domain,
            "context retrieval enabled"
        );
        Self::new(search, RetrievalConfig::from(settings))
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    pub fn backend_name(&self) -> &str {
        self.search.name()
    }

    /// Main text of the destination's page, or `""` when anything fails.
    pub async fn retrieve_context(&self, destination: &str) -> String {
        match self.try_retrieve(destination).await {
            Ok(context) => context,
            Err(e) => {
                warn!(destination, error = %e, "context retrieval failed");
                String::new()
            }
        }
    }

    async fn try_retrieve(&self, destination: &str) -> Result<String, RetrievalError> {
        let query = format!("{destination} site:{}", self.config.site_domain);
        let hits = self.search.search(&query, 1).await?;
        let Some(hit) = hits.into_iter().next() else {
            debug!(%query, "no search results");
            return Ok(String::new());
        };

        let response = self
            .client
            .get(&hit.url)
            .send()
            .await
            .map_err(|e| RetrievalError::Fetch(format!("{}: {e}", hit.url)))?;

        let status = response.status();
        if !status.is_success() {
            debug!(url = %hit.url, %status, "page fetch returned non-success status");
            return Ok(String::new());
        }

        let html = response
            .text()
            .await
            .map_err(|e| RetrievalError::Fetch(format!("{}: {e}", hit.url)))?;

        let selector = extract::parse_selector(&self.config.content_selector)?;
        let Some(text) = extract::extract_main_text(&html, &selector) else {
            debug!(url = %hit.url, selector = %self.config.content_selector, "content container missing");
            return Ok(String::new());
        };

        let context = truncate_chars(&text, self.config.max_context_chars).to_string();
        debug!(url = %hit.url, chars = context.chars().count(), "context retrieved");
        Ok(context)
    }
}

impl std::fmt::Debug for ContextRetriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextRetriever")
            .field("search", &self.search.name())
            .field("config", &self.config)
            .finish()
    }
}

/// Append retrieved context to a prompt. Empty context leaves it unchanged.
pub fn augment_prompt(prompt: &str, destination: &str, context: &str) -> String {
    if context.is_empty() {
        return prompt.to_string();
    }
    format!("{prompt}\n\nContext retrieved for {destination}:\n{context}")
}
