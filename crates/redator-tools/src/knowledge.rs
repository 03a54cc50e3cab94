//! The knowledge lookup contract
//!
//! A lookup never fails from the caller's point of view: transport errors,
//! missing pages and ambiguous titles all come back as text that the
//! writing stage can read.

/// Placeholder returned when the source has nothing for the topic.
pub const NO_INFORMATION: &str = "Nenhuma informação relevante encontrada na Wikipedia.";

/// The KnowledgeTool trait — implement this to add a research source.
#[async_trait::async_trait]
pub trait KnowledgeTool: Send + Sync {
    /// Short identifier used in logs (e.g. "wikipedia").
    fn name(&self) -> &str;

    /// Look up `topic` by exact title. Always returns text.
    async fn lookup(&self, topic: &str) -> String;
}

/// What a lookup produced, before it is flattened to text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LookupOutcome {
    Found(String),
    NotFound,
    /// The source pointed at a disambiguation page or a redirect notice.
    Ambiguous,
    /// Transport or HTTP failure.
    RequestFailed(String),
    /// The response arrived but could not be interpreted.
    Unreadable(String),
}

impl LookupOutcome {
    /// Classify a raw extract with the ambiguity heuristic.
    ///
    /// Substring match on English markers; Portuguese disambiguation pages
    /// are not detected.
    pub fn from_extract(extract: Option<&str>) -> Self {
        match extract.map(str::trim).filter(|e| !e.is_empty()) {
            None => Self::NotFound,
            Some(e) if e.contains("may refer to:") || e.to_lowercase().contains("redirect") => {
                Self::Ambiguous
            }
            Some(e) => Self::Found(e.to_string()),
        }
    }

    pub fn render(&self, topic: &str) -> String {
        match self {
            Self::Found(extract) => {
                format!("Pesquisa: {}\n\nContexto da Wikipedia:\n{}", topic, extract)
            }
            Self::NotFound => {
                format!("Pesquisa: {}\n\nContexto da Wikipedia:\n{}", topic, NO_INFORMATION)
            }
            Self::Ambiguous => format!(
                "Pesquisa ambígua. Tente um termo mais específico para '{}'.",
                topic
            ),
            Self::RequestFailed(e) => format!("Erro ao consultar a API da Wikipedia: {}", e),
            Self::Unreadable(e) => format!("Erro ao processar o resultado da Wikipedia: {}", e),
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }
}
