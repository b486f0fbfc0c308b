//! Local document discovery, extraction and chunking.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use crate::error::{AgentError, Result};

/// Default chunk length in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Default overlap between consecutive chunks in characters.
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

/// File extensions the reader can extract.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["pdf", "txt", "md"];

/// Text pulled from one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedDocument {
    pub path: PathBuf,
    pub filename: String,
    pub text: String,
    pub chunks: Vec<String>,
    pub metadata: serde_json::Value,
    /// Why extraction failed; `text` and `chunks` are empty when set.
    pub error: Option<String>,
}

impl ExtractedDocument {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    fn failed(path: &Path, error: String) -> Self {
        Self {
            path: path.to_path_buf(),
            filename: file_name(path),
            text: String::new(),
            chunks: Vec::new(),
            metadata: json!({ "error": error }),
            error: Some(error),
        }
    }
}

/// Reads PDF and plain-text documents from a data directory.
#[derive(Debug, Clone)]
pub struct DocumentReader {
    data_dir: PathBuf,
    chunk_size: usize,
    chunk_overlap: usize,
}

impl DocumentReader {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }

    pub fn with_chunking(mut self, chunk_size: usize, chunk_overlap: usize) -> Self {
        self.chunk_size = chunk_size;
        self.chunk_overlap = chunk_overlap;
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Supported documents directly inside the data directory, sorted by path.
    ///
    /// A missing directory yields an empty list.
    pub fn list_documents(&self) -> Result<Vec<PathBuf>> {
        if !self.data_dir.is_dir() {
            debug!(dir = %self.data_dir.display(), "Data directory does not exist");
            return Ok(Vec::new());
        }

        let base = glob::Pattern::escape(&self.data_dir.to_string_lossy());
        let mut paths = Vec::new();
        for ext in SUPPORTED_EXTENSIONS {
            let pattern = format!("{}/*.{}", base, ext);
            let entries = glob::glob(&pattern)
                .map_err(|e| AgentError::document(format!("bad pattern '{}': {}", pattern, e)))?;
            for entry in entries {
                match entry {
                    Ok(path) if path.is_file() => paths.push(path),
                    Ok(_) => {}
                    Err(e) => warn!(error = %e, "Skipping unreadable directory entry"),
                }
            }
        }
        paths.sort();
        Ok(paths)
    }

    /// Extract and chunk one document. Failures are reported in the result.
    pub fn read(&self, path: &Path) -> ExtractedDocument {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        if !SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
            return ExtractedDocument::failed(
                path,
                format!("Unsupported document type: {}", path.display()),
            );
        }

        if !path.exists() {
            return ExtractedDocument::failed(path, format!("File not found: {}", path.display()));
        }

        let (text, total_pages) = if extension == "pdf" {
            match extract_pdf(path) {
                Ok((text, pages)) => (text, Some(pages)),
                Err(e) => {
                    return ExtractedDocument::failed(
                        path,
                        format!("Failed to extract {}: {}", path.display(), e),
                    );
                }
            }
        } else {
            match std::fs::read_to_string(path) {
                Ok(text) => (text, None),
                Err(e) => {
                    return ExtractedDocument::failed(
                        path,
                        format!("Failed to read {}: {}", path.display(), e),
                    );
                }
            }
        };

        let chunks = chunk_text(&text, self.chunk_size, self.chunk_overlap);
        let filename = file_name(path);
        debug!(file = %filename, chars = text.chars().count(), chunks = chunks.len(), "Document extracted");

        let mut metadata = json!({
            "filename": filename,
            "format": extension,
            "characters": text.chars().count(),
        });
        if let Some(pages) = total_pages {
            metadata["total_pages"] = json!(pages);
        }

        ExtractedDocument {
            path: path.to_path_buf(),
            metadata,
            filename,
            text,
            chunks,
            error: None,
        }
    }
}

/// Page texts joined by blank lines, plus the page count.
///
/// A page whose content cannot be decoded contributes no text.
fn extract_pdf(path: &Path) -> std::result::Result<(String, usize), lopdf::Error> {
    let document = lopdf::Document::load(path)?;
    let pages = document.get_pages();

    let texts: Vec<String> = pages
        .keys()
        .map(|&page| match document.extract_text(&[page]) {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                warn!(file = %path.display(), page, error = %e, "Skipping unreadable PDF page");
                String::new()
            }
        })
        .collect();

    Ok((texts.join("\n\n"), pages.len()))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Split text into overlapping character windows.
///
/// A window that is not the last one ends just after its final `.` or newline
/// when that lies in the second half of the window. Chunks are trimmed and
/// empty ones dropped. Each window starts `overlap` characters before the
/// previous end, but always strictly after the previous start.
pub fn chunk_text(text: &str, size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    if len == 0 || size == 0 {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < len {
        let mut end = (start + size).min(len);
        if end < len
            && let Some(pos) = chars[start..end]
                .iter()
                .rposition(|c| *c == '.' || *c == '\n')
            && pos > size / 2
        {
            end = start + pos + 1;
        }

        let chunk: String = chars[start..end].iter().collect();
        let trimmed = chunk.trim();
        if !trimmed.is_empty() {
            chunks.push(trimmed.to_string());
        }

        if end >= len {
            break;
        }
        let next = end.saturating_sub(overlap);
        start = if next > start { next } else { end };
    }
    chunks
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
