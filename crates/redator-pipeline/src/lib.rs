//! Redator Pipeline - Input guard, research and writing stages, output contract

pub mod audit;
pub mod contract;
pub mod guard;
pub mod orchestrator;
pub mod stage;

pub use audit::{AuditLog, AuditRecord};
pub use contract::{ContractWarning, OutputContract};
pub use guard::{InjectionDetector, InputGuard, BUILTIN_PATTERNS};
pub use orchestrator::{LlmStageFactory, PipelineOrchestrator, StageFactory, ToolFactory};
pub use stage::{parse_article_json, ResearchStage, Stage, WritingInput, WritingStage};
