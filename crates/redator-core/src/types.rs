//! Core types for Redator

use serde::{Deserialize, Serialize};
use std::fmt;
use unicode_general_category::{get_general_category, GeneralCategory};

/// Pipeline step a failure is attributed to.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum StageId {
    InputGuard,
    ResearchStage,
    WritingStage,
    OutputContract,
}

impl StageId {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageId::InputGuard => "input_guard",
            StageId::ResearchStage => "research",
            StageId::WritingStage => "writing",
            StageId::OutputContract => "output_contract",
        }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// True for every char in the Unicode "C" general categories
/// (control, format, surrogate, private use, unassigned).
pub fn is_other_category(c: char) -> bool {
    matches!(
        get_general_category(c),
        GeneralCategory::Control
            | GeneralCategory::Format
            | GeneralCategory::Surrogate
            | GeneralCategory::PrivateUse
            | GeneralCategory::Unassigned
    )
}

/// Strip "C" category characters, then trim surrounding whitespace.
///
/// Idempotent: `sanitize(&sanitize(x)) == sanitize(x)`.
pub fn sanitize(text: &str) -> String {
    let stripped: String = text.chars().filter(|c| !is_other_category(*c)).collect();
    stripped.trim().to_string()
}

/// A topic that went through [`sanitize`] and is not empty.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct SanitizedTopic(String);

impl SanitizedTopic {
    /// Sanitize `raw`; `None` when nothing is left.
    pub fn sanitize(raw: &str) -> Option<Self> {
        let cleaned = sanitize(raw);
        if cleaned.is_empty() {
            None
        } else {
            Some(Self(cleaned))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SanitizedTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SanitizedTopic {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Text produced by the research stage for the writing stage.
///
/// "No information" and "ambiguous topic" outcomes of the knowledge lookup
/// are carried as ordinary text, not as a separate variant.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ResearchContext(String);

impl ResearchContext {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ResearchContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unvalidated writing-stage output.
///
/// Every field is optional so that a reply missing a field surfaces as a
/// schema violation rather than a parse failure.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ArticleDraft {
    #[serde(default, alias = "title")]
    pub titulo: Option<String>,
    #[serde(default, alias = "content")]
    pub conteudo: Option<String>,
    #[serde(default, alias = "keywords")]
    pub palavras_chave: Option<Vec<String>>,
}

impl ArticleDraft {
    pub fn new(
        titulo: impl Into<String>,
        conteudo: impl Into<String>,
        palavras_chave: Vec<String>,
    ) -> Self {
        Self {
            titulo: Some(titulo.into()),
            conteudo: Some(conteudo.into()),
            palavras_chave: Some(palavras_chave),
        }
    }
}

/// The final, validated article.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Article {
    #[serde(rename = "titulo")]
    pub title: String,
    #[serde(rename = "conteudo")]
    pub content: String,
    #[serde(rename = "palavras_chave")]
    pub keywords: Vec<String>,
}

impl Article {
    /// Whitespace-delimited token count of the body.
    pub fn word_count(&self) -> usize {
        word_count(&self.content)
    }

    /// Render as Markdown: heading, body, keyword line, word-count footer.
    pub fn to_markdown(&self) -> String {
        format!(
            "# {}\n\n{}\n\n--- \n\n**Palavras-chave:** {}\n\n*(Contagem de Palavras: {})*\n",
            self.title,
            self.content,
            self.keywords.join(", "),
            self.word_count()
        )
    }
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
