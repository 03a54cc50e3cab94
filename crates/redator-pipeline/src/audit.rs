//! Audit trail for suspicious input
//!
//! Every record goes to the `redator::audit` tracing target. When a file is
//! configured, the record is also appended to it as one JSON line. Writes
//! are attempted once; a failed write is logged and dropped.

use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{error, warn};

/// One JSONL line in the audit file.
#[derive(Debug, Clone, Serialize)]
pub struct AuditRecord<'a> {
    pub timestamp: String,
    pub id: String,
    pub kind: &'a str,
    pub pattern: Option<&'a str>,
    /// Raw input exactly as received, before sanitization.
    pub raw: &'a str,
}

#[derive(Debug, Clone, Default)]
pub struct AuditLog {
    path: Option<PathBuf>,
}

impl AuditLog {
    /// Log-only audit trail.
    pub fn tracing_only() -> Self {
        Self { path: None }
    }

    pub fn to_file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    pub fn record(&self, kind: &str, pattern: Option<&str>, raw: &str) {
        let record = AuditRecord {
            timestamp: chrono::Utc::now().to_rfc3339(),
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            pattern,
            raw,
        };

        warn!(
            target: "redator::audit",
            audit_id = %record.id,
            kind,
            pattern = pattern.unwrap_or(""),
            raw = ?raw,
            "Potential prompt injection detected"
        );

        if let Some(path) = &self.path {
            if let Err(e) = append_line(path, &record) {
                error!(target: "redator::audit", path = %path.display(), "audit write failed: {}", e);
            }
        }
    }
}

fn append_line(path: &Path, record: &AuditRecord<'_>) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut line = serde_json::to_string(record)?;
    line.push('\n');
    let mut f = OpenOptions::new().create(true).append(true).open(path)?;
    f.write_all(line.as_bytes())
}
