pub mod gemini;
pub mod http;
pub mod mock;
pub mod openai;

pub use gemini::{GeminiConfig, GeminiProvider};
pub use mock::{MockProvider, MockResponse};
pub use openai::{OpenAiConfig, OpenAiProvider};
