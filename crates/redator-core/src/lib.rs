//! Redator Core - Types, configuration, and error handling

pub mod config;
pub mod error;
pub mod types;

pub use config::{
    BindMode, ContractConfig, GuardConfig, KnowledgeConfig, LlmConfig, RedatorConfig,
    ServerConfig, StageSpec, StagesConfig, WordCountPolicy,
};
pub use error::{Error, PipelineResult, Rejection, Result};
pub use types::*;
