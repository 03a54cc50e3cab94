//! Input guard — length limit, sanitization, prompt-injection screening
//!
//! Runs before any external call. Detection is a whole-text regex search,
//! so paraphrases slip through and innocent topics that quote a pattern
//! are refused.

use crate::audit::AuditLog;
use redator_core::{Error, GuardConfig, Rejection, Result, SanitizedTopic};
use regex::{Regex, RegexBuilder};
use tracing::debug;

/// Built-in patterns, matched case-insensitively.
///
/// Sanitizing deletes tabs and newlines, which can glue two words together,
/// so word gaps are `\s*`.
pub const BUILTIN_PATTERNS: &[&str] = &[
    r"ignore.*previous\s*instructions",
    r"disregard.*(previous|prior)\s*instructions",
    r"act\s*as\s*if",
    r"you\s*are\s*now",
    r"forget\s*everything",
    r"important\s*instruction:",
    r"new\s*goal:",
    r"your\s*instructions\s*are",
    r"reveal.*system\s*prompt",
];

#[derive(Debug, Clone)]
pub struct InjectionDetector {
    patterns: Vec<Regex>,
}

impl InjectionDetector {
    /// Built-in patterns plus `extra`. An invalid extra pattern is a config error.
    pub fn new(extra: &[String]) -> Result<Self> {
        let patterns = BUILTIN_PATTERNS
            .iter()
            .copied()
            .chain(extra.iter().map(String::as_str))
            .map(|p| {
                RegexBuilder::new(p)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| Error::ConfigError(format!("invalid injection pattern {:?}: {}", p, e)))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    /// First pattern found anywhere in `text`.
    pub fn detect(&self, text: &str) -> Option<&str> {
        self.patterns
            .iter()
            .find(|re| re.is_match(text))
            .map(|re| re.as_str())
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// Gate every topic passes before the pipeline sees it.
#[derive(Debug, Clone)]
pub struct InputGuard {
    max_chars: usize,
    detector: InjectionDetector,
    audit: AuditLog,
}

impl InputGuard {
    pub fn new(max_chars: usize, detector: InjectionDetector, audit: AuditLog) -> Self {
        Self { max_chars, detector, audit }
    }

    pub fn from_config(config: &GuardConfig) -> Result<Self> {
        let audit = match &config.audit_log {
            Some(path) => AuditLog::to_file(path),
            None => AuditLog::tracing_only(),
        };
        Ok(Self::new(
            config.max_topic_chars,
            InjectionDetector::new(&config.extra_patterns)?,
            audit,
        ))
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    /// Length check, then sanitization, then injection screening.
    ///
    /// The length limit counts chars of the raw input and is checked even if
    /// the caller already enforced it.
    pub fn admit(&self, raw: &str) -> std::result::Result<SanitizedTopic, Rejection> {
        let len = raw.chars().count();
        if len > self.max_chars {
            return Err(Rejection::TooLong { len, max: self.max_chars });
        }

        let topic = SanitizedTopic::sanitize(raw).ok_or(Rejection::EmptyAfterSanitization)?;

        if let Some(pattern) = self.detector.detect(topic.as_str()) {
            let rejection = Rejection::SuspiciousInput {
                pattern: pattern.to_string(),
            };
            self.audit.record(rejection.kind(), Some(pattern), raw);
            return Err(rejection);
        }

        debug!(topic = %topic, "topic admitted");
        Ok(topic)
    }
}

impl Default for InputGuard {
    fn default() -> Self {
        Self::from_config(&GuardConfig::default()).expect("built-in injection patterns compile")
    }
}
