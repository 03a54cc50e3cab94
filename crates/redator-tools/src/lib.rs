//! Redator Tools — knowledge lookups used by the research stage
//!
//! Each tool is a self-contained file in src/tools/ implementing
//! [`KnowledgeTool`].

pub mod knowledge;
pub mod tools;

pub use knowledge::{KnowledgeTool, LookupOutcome, NO_INFORMATION};
pub use tools::fixed::FixedTextTool;
pub use tools::wikipedia::WikipediaTool;
