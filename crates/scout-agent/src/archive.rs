//! Archive of finished research sessions.
//!
//! Sessions are kept in memory in completion order and, when the archive is
//! file-backed, appended to a JSONL file (one [`ArchivedSession`] per line).

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::Result;
use crate::state::{SessionState, SourceFlags};

/// Archive file name inside the data directory.
pub const ARCHIVE_FILE: &str = "sessions.jsonl";

// ─────────────────────────────────────────────────────────────────────────────
// Record
// ─────────────────────────────────────────────────────────────────────────────

/// A finished session as kept in the archive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchivedSession {
    pub id: Uuid,
    pub question: String,
    pub answer: String,
    pub sources: Vec<String>,
    /// Human-readable history lines.
    pub history: Vec<String>,
    pub iteration: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_flags: Option<SourceFlags>,
    pub timestamp: DateTime<Utc>,
}

impl From<&SessionState> for ArchivedSession {
    fn from(state: &SessionState) -> Self {
        Self {
            id: state.id,
            question: state.question.clone(),
            answer: state.answer().to_string(),
            sources: state.sources.clone(),
            history: state.history_lines(),
            iteration: state.iteration,
            source_flags: state.source_flags,
            timestamp: state.finished_at.unwrap_or_else(Utc::now),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Archive
// ─────────────────────────────────────────────────────────────────────────────

/// Append-only list of finished sessions.
#[derive(Debug)]
pub struct SessionArchive {
    path: Option<PathBuf>,
    sessions: Mutex<Vec<ArchivedSession>>,
}

impl SessionArchive {
    /// Archive that lives only in memory.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            sessions: Mutex::new(Vec::new()),
        }
    }

    /// Load the archive at `path`, creating nothing until the first append.
    ///
    /// Lines that fail to parse are skipped with a warning.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut sessions = Vec::new();

        if path.is_file() {
            let content = fs::read_to_string(&path)?;
            for (n, line) in content.lines().enumerate() {
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<ArchivedSession>(line) {
                    Ok(session) => sessions.push(session),
                    Err(e) => warn!(path = %path.display(), line = n + 1, error = %e, "Skipping bad archive line"),
                }
            }
        }

        debug!(path = %path.display(), sessions = sessions.len(), "Session archive loaded");
        Ok(Self {
            path: Some(path),
            sessions: Mutex::new(sessions),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Archive a finished session.
    pub fn append(&self, state: &SessionState) -> Result<ArchivedSession> {
        let record = ArchivedSession::from(state);
        let mut sessions = self.sessions.lock();

        if let Some(path) = &self.path {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer(&mut writer, &record)?;
            writer.write_all(b"\n")?;
            writer.flush()?;
        }

        sessions.push(record.clone());
        Ok(record)
    }

    /// The `n` most recent sessions, newest first.
    pub fn recent(&self, n: usize) -> Vec<ArchivedSession> {
        self.sessions.lock().iter().rev().take(n).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }
}

/// Numbered source list for display.
///
/// Web sources render as markdown links. Duplicates are dropped, keeping the
/// first occurrence.
pub fn format_sources(sources: &[String]) -> String {
    let mut seen: Vec<&str> = Vec::new();
    for source in sources {
        let source = source.trim();
        if !source.is_empty() && !seen.contains(&source) {
            seen.push(source);
        }
    }
    if seen.is_empty() {
        return "No sources available".to_string();
    }

    seen.iter()
        .enumerate()
        .map(|(i, s)| {
            if is_web_url(s) {
                format!("{}. [{}]({})", i + 1, s, s)
            } else {
                format!("{}. {}", i + 1, s)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn is_web_url(source: &str) -> bool {
    url::Url::parse(source).is_ok_and(|u| matches!(u.scheme(), "http" | "https"))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
