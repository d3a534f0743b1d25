pub mod dispatch;
pub mod error;
pub mod pipeline;
pub mod prompt;
pub mod retrieval;
pub mod sink;
pub mod stages;

pub use dispatch::{ProviderRegistry, AI_ERROR_PREFIX, UNSUPPORTED_PROVIDER_MESSAGE};
pub use error::RetrievalError;
pub use pipeline::{Pipeline, PipelineBuilder};
pub use retrieval::{ContextRetriever, RetrievalConfig};
pub use sink::{LoggingSink, ResultSink};
pub use stages::Stage;
