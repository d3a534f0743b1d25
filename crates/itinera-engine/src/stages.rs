//! The pipeline's stages. Every stage is total: it reads the state and
//! returns a patch, turning failures into text or no-ops.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use itinera_core::provider::ProviderKind;
use itinera_core::state::{PipelineState, StatePatch};

use crate::dispatch::ProviderRegistry;
use crate::prompt::preprocess_input;
use crate::retrieval::{augment_prompt, extract_destination, ContextRetriever};
use crate::sink::ResultSink;

#[async_trait]
pub trait Stage: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run(&self, state: &PipelineState) -> StatePatch;
}

/// Builds the prompt from history and the current input.
pub struct PreprocessInput;

#[async_trait]
impl Stage for PreprocessInput {
    fn name(&self) -> &'static str {
        "preprocess_input"
    }

    async fn run(&self, state: &PipelineState) -> StatePatch {
        preprocess_input(state)
    }
}

/// Appends travel-wiki context for the requested destination to the prompt.
pub struct RagRetrieveContext {
    registry: Arc<ProviderRegistry>,
    retriever: Arc<ContextRetriever>,
}

impl RagRetrieveContext {
    pub fn new(registry: Arc<ProviderRegistry>, retriever: Arc<ContextRetriever>) -> Self {
        Self {
            registry,
            retriever,
        }
    }
}

#[async_trait]
impl Stage for RagRetrieveContext {
    fn name(&self) -> &'static str {
        "rag_retrieve_context"
    }

    async fn run(&self, state: &PipelineState) -> StatePatch {
        let Some(provider) = ProviderKind::from_key(&state.ai_provider)
            .and_then(|kind| self.registry.get(kind))
        else {
            debug!(ai_provider = %state.ai_provider, "no usable provider, skipping retrieval");
            return StatePatch::empty();
        };

        let destination = match extract_destination(&**provider, &state.user_input).await {
            Ok(d) => d,
            Err(e) => {
                debug!(error = %e, "destination extraction failed, skipping retrieval");
                return StatePatch::empty();
            }
        };

        let context = self.retriever.retrieve_context(&destination).await;
        if context.is_empty() {
            return StatePatch::empty();
        }

        StatePatch::prompt(augment_prompt(state.prompt_or_empty(), &destination, &context))
    }
}

/// Sends the prompt to the requested provider.
pub struct CallAi {
    registry: Arc<ProviderRegistry>,
}

impl CallAi {
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl Stage for CallAi {
    fn name(&self) -> &'static str {
        "call_ai"
    }

    async fn run(&self, state: &PipelineState) -> StatePatch {
        self.registry.call_ai(state).await
    }
}

/// Hands the finished itinerary to the result sink.
pub struct SaveResult {
    sink: Arc<dyn ResultSink>,
}

impl SaveResult {
    pub fn new(sink: Arc<dyn ResultSink>) -> Self {
        Self { sink }
    }
}

#[async_trait]
impl Stage for SaveResult {
    fn name(&self) -> &'static str {
        "save_result"
    }

    async fn run(&self, state: &PipelineState) -> StatePatch {
        self.sink.save(state).await;
        StatePatch::empty()
    }
}

pub struct ReturnOutput;

#[async_trait]
impl Stage for ReturnOutput {
    fn name(&self) -> &'static str {
        "return_output"
    }

    async fn run(&self, state: &PipelineState) -> StatePatch {
        return_output(state)
    }
}

/// Final stage body. `success` is always true, error text included.
pub fn return_output(state: &PipelineState) -> StatePatch {
    StatePatch {
        output: Some(state.itinerary_or_empty().to_string()),
        success: Some(true),
        ..StatePatch::default()
    }
}
