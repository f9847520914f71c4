//! Summary cache for non-Python files.
//!
//! Real summarization is an external concern; this layer caches structural
//! metadata records so repeat reads of config/markdown/text files cost a
//! fraction of the full content. Records are keyed by content hash and go
//! stale automatically when the file changes.

use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value, json};
use sha2::{Digest, Sha256};

pub struct FileSummarizer {
    cache_dir: PathBuf,
}

impl FileSummarizer {
    pub fn new(cache_dir: PathBuf) -> Self {
        if let Err(e) = std::fs::create_dir_all(&cache_dir) {
            tracing::warn!("Cannot create summary cache dir {}: {e}", cache_dir.display());
        }
        Self { cache_dir }
    }

    /// Load the cached summary for a file's current content, if any.
    pub fn load_cached(&self, file_path: &Path) -> Option<Map<String, Value>> {
        let cache_file = self.cache_file(file_path)?;
        let text = std::fs::read_to_string(cache_file).ok()?;
        serde_json::from_str(&text).ok()
    }

    /// Generate and cache a summary record on a background thread.
    pub fn schedule_summarization(&self, file_path: PathBuf, content: String) {
        let cache_dir = self.cache_dir.clone();
        std::thread::spawn(move || {
            let summarizer = FileSummarizer { cache_dir };
            if let Err(e) = summarizer.write_summary(&file_path, &content) {
                tracing::warn!("Failed to summarize {}: {e}", file_path.display());
            }
        });
    }

    fn write_summary(&self, file_path: &Path, content: &str) -> std::io::Result<()> {
        let lines: Vec<&str> = content.lines().collect();
        let summary = json!({
            "summary": summary_text(file_path, &lines, content),
            "file_type": extension_of(file_path),
            "line_count": lines.len(),
            "size_bytes": content.len(),
            "generated_at": Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            "version": "metadata_v1",
        });

        let Some(cache_file) = self.cache_file(file_path) else {
            return Ok(());
        };
        std::fs::write(cache_file, serde_json::to_string_pretty(&summary)?)
    }

    /// Number of summary records currently cached.
    pub fn cached_count(&self) -> usize {
        std::fs::read_dir(&self.cache_dir)
            .map(|entries| {
                entries
                    .filter_map(Result::ok)
                    .filter(|e| {
                        e.path().extension().and_then(|x| x.to_str()) == Some("json")
                    })
                    .count()
            })
            .unwrap_or(0)
    }

    fn cache_file(&self, file_path: &Path) -> Option<PathBuf> {
        let bytes = std::fs::read(file_path).ok()?;
        let digest = Sha256::digest(&bytes);
        let hash: String = digest.iter().take(8).map(|b| format!("{b:02x}")).collect();
        let name = file_path.file_name()?.to_string_lossy();
        Some(self.cache_dir.join(format!("{name}_{hash}.json")))
    }
}

/// Structural placeholder summary; a proper LLM summary lives outside the
/// core.
fn summary_text(file_path: &Path, lines: &[&str], content: &str) -> String {
    let name = file_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let file_type = extension_of(file_path);

    match file_type.as_str() {
        ".md" | ".txt" | ".rst" => {
            let headers: Vec<&str> = lines
                .iter()
                .take(20)
                .map(|l| l.trim())
                .filter(|l| l.starts_with('#'))
                .take(3)
                .collect();
            let header_summary = if headers.is_empty() {
                "No headers".to_string()
            } else {
                headers.join(", ")
            };
            format!(
                "Document: {name}\nType: {file_type}\nLines: {}\nHeaders: {header_summary}",
                lines.len()
            )
        }
        _ => format!(
            "File: {name}\nType: {file_type}\nLines: {}\nSize: {} bytes",
            lines.len(),
            content.len()
        ),
    }
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default()
}
