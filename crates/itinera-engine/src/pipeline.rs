//! Fixed-order pipeline: preprocess → [retrieve] → call → save → return.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info_span, Instrument};
use uuid::Uuid;

use itinera_core::state::{PipelineState, TravelRequest, TravelResponse};

use crate::dispatch::ProviderRegistry;
use crate::retrieval::ContextRetriever;
use crate::sink::{LoggingSink, ResultSink};
use crate::stages::{CallAi, PreprocessInput, RagRetrieveContext, ReturnOutput, SaveResult, Stage};

/// An ordered list of stages applied to one state per invocation.
/// Shared across requests; holds no per-request data.
pub struct Pipeline {
    stages: Vec<Arc<dyn Stage>>,
    registry: Arc<ProviderRegistry>,
}

impl Pipeline {
    pub fn builder(registry: Arc<ProviderRegistry>) -> PipelineBuilder {
        PipelineBuilder {
            registry,
            retriever: None,
            sink: Arc::new(LoggingSink),
        }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    pub fn has_retrieval(&self) -> bool {
        self.stages.iter().any(|s| s.name() == "rag_retrieve_context")
    }

    /// Run every stage in order and return the final state. Never fails.
    pub async fn run(&self, mut state: PipelineState) -> PipelineState {
        let run_id = Uuid::now_v7();
        let span = info_span!("pipeline", %run_id, ai_provider = %state.ai_provider);

        async move {
            for stage in &self.stages {
                let start = Instant::now();
                let patch = stage.run(&state).await;
                debug!(
                    stage = stage.name(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "stage complete"
                );
                state.apply(patch);
            }
            state
        }
        .instrument(span)
        .await
    }

    /// Run a request and project the final state onto the response shape.
    pub async fn plan(&self, request: TravelRequest) -> TravelResponse {
        let state = self.run(request.into_state()).await;
        TravelResponse {
            output: state.output.unwrap_or_default(),
            success: state.success.unwrap_or(true),
            ai_provider: state.ai_provider,
        }
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stage_names())
            .field("registry", &self.registry)
            .finish()
    }
}

pub struct PipelineBuilder {
    registry: Arc<ProviderRegistry>,
    retriever: Option<Arc<ContextRetriever>>,
    sink: Arc<dyn ResultSink>,
}

impl PipelineBuilder {
    /// Insert the retrieval stage between preprocessing and the model call.
    pub fn with_retrieval(mut self, retriever: ContextRetriever) -> Self {
        self.retriever = Some(Arc::new(retriever));
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn ResultSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn build(self) -> Pipeline {
        let mut stages: Vec<Arc<dyn Stage>> = vec![Arc::new(PreprocessInput)];
        if let Some(retriever) = self.retriever {
            stages.push(Arc::new(RagRetrieveContext::new(self.registry.clone(), retriever)));
        }
        stages.push(Arc::new(CallAi::new(self.registry.clone())));
        stages.push(Arc::new(SaveResult::new(self.sink)));
        stages.push(Arc::new(ReturnOutput));

        Pipeline {
            stages,
            registry: self.registry,
        }
    }
}
