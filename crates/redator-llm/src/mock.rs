//! MockProvider — deterministic LLM responses for testing
//!
//! Implements [`LlmProvider`] with canned replies, records every request it
//! receives, and counts calls.

use crate::provider::{LlmError, LlmProvider, LlmResult};
use crate::types::{LlmRequest, LlmResponse};
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Mock behavior configuration
#[derive(Clone)]
pub enum MockBehavior {
    /// Return a fixed text reply
    Text(String),
    /// Build the reply from the request
    Respond(Arc<dyn Fn(&LlmRequest) -> String + Send + Sync>),
    /// Fail with a request error
    Error(String),
}

impl MockBehavior {
    pub fn respond(f: impl Fn(&LlmRequest) -> String + Send + Sync + 'static) -> Self {
        Self::Respond(Arc::new(f))
    }
}

impl fmt::Debug for MockBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(t) => f.debug_tuple("Text").field(t).finish(),
            Self::Respond(_) => f.write_str("Respond(..)"),
            Self::Error(e) => f.debug_tuple("Error").field(e).finish(),
        }
    }
}

/// A sequence of behaviors — each call to `complete` pops the next one.
/// If the sequence is exhausted, the default behavior is used.
pub struct MockProvider {
    behaviors: Mutex<Vec<MockBehavior>>,
    default_behavior: MockBehavior,
    requests: Mutex<Vec<LlmRequest>>,
}

impl MockProvider {
    /// Create a mock that always returns the same behavior
    pub fn constant(behavior: MockBehavior) -> Self {
        Self {
            behaviors: Mutex::new(Vec::new()),
            default_behavior: behavior,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Create a mock with a sequence of behaviors (consumed in order)
    pub fn sequence(behaviors: Vec<MockBehavior>) -> Self {
        Self {
            behaviors: Mutex::new(behaviors),
            default_behavior: MockBehavior::Text("(mock: sequence exhausted)".into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Get the number of calls made
    pub async fn call_count(&self) -> usize {
        self.requests.lock().await.len()
    }

    /// Every request received so far, in call order.
    pub async fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().await.clone()
    }

    async fn next_behavior(&self) -> MockBehavior {
        let mut behaviors = self.behaviors.lock().await;
        if behaviors.is_empty() {
            self.default_behavior.clone()
        } else {
            behaviors.remove(0)
        }
    }
}

#[async_trait::async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str { "mock" }

    async fn complete(&self, request: LlmRequest) -> LlmResult<LlmResponse> {
        let behavior = self.next_behavior().await;
        let reply = match &behavior {
            MockBehavior::Text(text) => Ok(LlmResponse::text(text.clone())),
            MockBehavior::Respond(f) => Ok(LlmResponse::text(f(&request))),
            MockBehavior::Error(msg) => Err(LlmError::RequestFailed(msg.clone())),
        };
        self.requests.lock().await.push(request);
        reply
    }
}
