//! Error types for Redator

use crate::types::{Article, StageId};
use thiserror::Error;

/// Why the input guard refused a topic.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    #[error("O assunto excede o limite de {max} caracteres (recebido: {len}).")]
    TooLong { len: usize, max: usize },

    #[error("Assunto inválido ou vazio após sanitização.")]
    EmptyAfterSanitization,

    #[error("Entrada suspeita detectada. Por favor, forneça apenas o tema do artigo.")]
    SuspiciousInput { pattern: String },
}

impl Rejection {
    pub fn kind(&self) -> &'static str {
        match self {
            Rejection::TooLong { .. } => "TooLong",
            Rejection::EmptyAfterSanitization => "EmptyAfterSanitization",
            Rejection::SuspiciousInput { .. } => "SuspiciousInput",
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Rejected(#[from] Rejection),

    #[error("upstream generation error in {stage}: {message}")]
    Upstream { stage: StageId, message: String },

    #[error("output schema error in {stage}: {message}")]
    OutputSchema { stage: StageId, message: String },

    #[error("config error: {0}")]
    ConfigError(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Outcome of one pipeline run.
pub type PipelineResult = Result<Article>;

impl Error {
    pub fn upstream(stage: StageId, message: impl Into<String>) -> Self {
        Self::Upstream {
            stage,
            message: message.into(),
        }
    }

    pub fn schema(stage: StageId, message: impl Into<String>) -> Self {
        Self::OutputSchema {
            stage,
            message: message.into(),
        }
    }

    /// Stage the failure belongs to. `None` for errors raised outside a run.
    pub fn stage(&self) -> Option<StageId> {
        match self {
            Self::Rejected(_) => Some(StageId::InputGuard),
            Self::Upstream { stage, .. } | Self::OutputSchema { stage, .. } => Some(*stage),
            Self::ConfigError(_) | Self::Internal(_) => None,
        }
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Self::Rejected(r) => Some(r),
            _ => None,
        }
    }

    pub fn is_upstream(&self) -> bool {
        matches!(self, Self::Upstream { .. })
    }
}
