//! Output contract — the shape a final article must have

use redator_core::{
    word_count, Article, ArticleDraft, ContractConfig, Error, Result, StageId, WordCountPolicy,
};
use std::fmt;
use tracing::warn;

/// A soft finding that does not fail the contract under the `warn` policy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContractWarning {
    ShortContent { words: usize, min: usize },
}

impl fmt::Display for ContractWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShortContent { words, min } => write!(
                f,
                "article has only {} words, {} required",
                words, min
            ),
        }
    }
}

#[derive(Clone, Debug)]
pub struct OutputContract {
    min_keywords: usize,
    max_keywords: usize,
    min_words: usize,
    policy: WordCountPolicy,
}

impl Default for OutputContract {
    fn default() -> Self {
        Self::from_config(&ContractConfig::default())
    }
}

impl OutputContract {
    pub fn from_config(config: &ContractConfig) -> Self {
        Self {
            min_keywords: config.min_keywords,
            max_keywords: config.max_keywords,
            min_words: config.min_words,
            policy: config.word_count_policy,
        }
    }

    pub fn policy(&self) -> WordCountPolicy {
        self.policy
    }

    /// Structural checks first; every violation is reported together.
    /// Then the word-count rule, which only fails under [`WordCountPolicy::Reject`].
    pub fn validate(&self, draft: ArticleDraft) -> Result<Article> {
        let mut violations = Vec::new();

        let title = draft.titulo.as_deref().map(str::trim).unwrap_or_default();
        if title.is_empty() {
            violations.push("titulo is missing or empty".to_string());
        }
        if draft.conteudo.is_none() {
            violations.push("conteudo is missing".to_string());
        }
        match &draft.palavras_chave {
            None => violations.push("palavras_chave is missing".to_string()),
            Some(keywords) => {
                if keywords.len() < self.min_keywords || keywords.len() > self.max_keywords {
                    violations.push(format!(
                        "palavras_chave must have {} to {} entries, got {}",
                        self.min_keywords,
                        self.max_keywords,
                        keywords.len()
                    ));
                }
                if keywords.iter().any(|k| k.trim().is_empty()) {
                    violations.push("palavras_chave contains an empty entry".to_string());
                }
            }
        }

        if !violations.is_empty() {
            return Err(Error::schema(StageId::OutputContract, violations.join("; ")));
        }

        let article = Article {
            title: title.to_string(),
            content: draft.conteudo.unwrap_or_default(),
            keywords: draft
                .palavras_chave
                .unwrap_or_default()
                .into_iter()
                .map(|k| k.trim().to_string())
                .collect(),
        };

        for warning in self.warnings(&article) {
            match self.policy {
                WordCountPolicy::Warn => warn!(title = %article.title, "{}", warning),
                WordCountPolicy::Reject => {
                    return Err(Error::schema(StageId::OutputContract, warning.to_string()))
                }
            }
        }

        Ok(article)
    }

    /// Soft findings for an already well-formed article.
    pub fn warnings(&self, article: &Article) -> Vec<ContractWarning> {
        let words = word_count(&article.content);
        if words < self.min_words {
            vec![ContractWarning::ShortContent { words, min: self.min_words }]
        } else {
            Vec::new()
        }
    }
}
