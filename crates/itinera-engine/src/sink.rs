//! Persistence stub. Results are handed to a [`ResultSink`]; the only sink
//! shipped logs a summary and stores nothing.

use async_trait::async_trait;
use tracing::info;

use itinera_core::state::PipelineState;
use itinera_core::text::truncate_chars;

const INPUT_PREVIEW_CHARS: usize = 50;

/// Destination for finished pipeline results.
#[async_trait]
pub trait ResultSink: Send + Sync {
    async fn save(&self, state: &PipelineState);
}

/// Sink that only emits a log line.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingSink;

/// Fields logged for a saved result.
#[derive(Debug, PartialEq, Eq)]
pub struct SaveSummary<'a> {
    pub provider: &'a str,
    pub input_preview: &'a str,
    pub output_len: usize,
}

pub fn summarize(state: &PipelineState) -> SaveSummary<'_> {
    SaveSummary {
        provider: &state.ai_provider,
        input_preview: truncate_chars(&state.user_input, INPUT_PREVIEW_CHARS),
        output_len: state.itinerary_or_empty().chars().count(),
    }
}

#[async_trait]
impl ResultSink for LoggingSink {
    async fn save(&self, state: &PipelineState) {
        let summary = summarize(state);
        info!(
            provider = summary.provider,
            input = summary.input_preview,
            output_len = summary.output_len,
            "Saving result (no durable store configured)"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_truncates_input() {
        let mut state = PipelineState::new("á".repeat(80), "gemini", Vec::new());
        state.itinerary = Some("Ngày 1".into());

        let summary = summarize(&state);
        assert_eq!(summary.provider, "gemini");
        assert_eq!(summary.input_preview.chars().count(), 50);
        assert_eq!(summary.output_len, 6);
    }

    #[test]
    fn summary_without_itinerary() {
        let state = PipelineState::new("short", "gpt", Vec::new());
        let summary = summarize(&state);
        assert_eq!(summary.input_preview, "short");
        assert_eq!(summary.output_len, 0);
    }

    #[tokio::test]
    async fn logging_sink_accepts_any_state() {
        LoggingSink.save(&PipelineState::default()).await;
    }
}
