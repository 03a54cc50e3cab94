//! Redator LLM - Text-generation backend adapters

pub mod mock;
pub mod openai;
pub mod provider;
pub mod types;

pub use mock::{MockBehavior, MockProvider};
pub use openai::OpenAiCompatProvider;
pub use provider::{LlmError, LlmProvider, LlmResult};
pub use types::*;
