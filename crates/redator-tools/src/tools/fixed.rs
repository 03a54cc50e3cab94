//! Fixed-text tool — returns the same extract for every topic
//!
//! Used for offline runs and as a stand-in for the real lookup in tests.

use crate::knowledge::{KnowledgeTool, LookupOutcome};
use std::sync::atomic::{AtomicUsize, Ordering};

pub struct FixedTextTool {
    extract: Option<String>,
    calls: AtomicUsize,
}

impl FixedTextTool {
    pub fn new(extract: impl Into<String>) -> Self {
        Self {
            extract: Some(extract.into()),
            calls: AtomicUsize::new(0),
        }
    }

    /// A tool that never finds anything.
    pub fn empty() -> Self {
        Self {
            extract: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl KnowledgeTool for FixedTextTool {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn lookup(&self, topic: &str) -> String {
        self.calls.fetch_add(1, Ordering::SeqCst);
        LookupOutcome::from_extract(self.extract.as_deref()).render(topic)
    }
}
