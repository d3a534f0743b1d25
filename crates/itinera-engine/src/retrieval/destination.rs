//! Destination extraction: a short model call naming the place a request is about.

use itinera_core::provider::{GenerationOptions, TextProvider};

use crate::error::RetrievalError;

const EXTRACTION_OPTIONS: GenerationOptions = GenerationOptions {
    temperature: 0.0,
    max_output_tokens: 32,
};

fn extraction_prompt(text: &str) -> String {
    format!(
        "Extract the travel destination from the user's message below. \
         Reply with the place name only, written without Vietnamese accents \
         (for example \"Da Lat\" or \"Ha Noi\"), and nothing else.\n\n\
         Message: {text}"
    )
}

/// Reduce a model reply to a bare place name.
pub fn normalize_destination(reply: &str) -> Option<String> {
    let line = reply.lines().map(str::trim).find(|l| !l.is_empty())?;
    let name = line
        .trim_matches(|c: char| matches!(c, '"' | '\'' | '`' | '*' | '“' | '”'))
        .trim_end_matches(|c: char| matches!(c, '.' | ',' | ';' | ':' | '!' | '?'))
        .trim();
    (!name.is_empty()).then(|| name.to_string())
}

pub async fn extract_destination(
    provider: &dyn TextProvider,
    text: &str,
) -> Result<String, RetrievalError> {
    let reply = provider
        .generate(&extraction_prompt(text), &EXTRACTION_OPTIONS)
        .await?;
    normalize_destination(&reply).ok_or(RetrievalError::NoDestination)
}
