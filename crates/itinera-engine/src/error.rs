use itinera_core::errors::GatewayError;

/// Failures inside context retrieval. Never escapes the retrieval stage.
#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("destination extraction failed: {0}")]
    Extraction(#[from] GatewayError),

    #[error("model returned no destination")]
    NoDestination,

    #[error("search failed: {0}")]
    Search(String),

    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("invalid content selector {selector:?}: {reason}")]
    InvalidSelector { selector: String, reason: String },
}
