//! Content-addressed metadata store.
//!
//! Each parsed file gets one JSON record keyed by (path, content hash); the
//! index file maps every known path to its current state. A record is only
//! served when the stored hash still matches the bytes on disk; any hash
//! change means a full reparse.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{GraphError, GraphResult};
use crate::node::CodeNode;

/// Hex width of the truncated SHA-256 content hash.
const HASH_WIDTH: usize = 16;

/// Per-file state tracked by the index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileIndexEntry {
    /// Content hash at last parse; `None` for discovered-only entries.
    pub hash: Option<String>,
    /// `true` once the file has been parsed; `false` means it was only
    /// discovered through an import reference.
    pub indexed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indexed_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discovered_at: Option<String>,
    /// Absolute paths resolved from this file's import statements.
    #[serde(default)]
    pub imports: Vec<String>,
    /// Ids of all nodes belonging to this file (populated when indexed).
    #[serde(default)]
    pub node_ids: Vec<String>,
    #[serde(default)]
    pub node_count: usize,
}

impl FileIndexEntry {
    fn discovered(timestamp: String) -> Self {
        Self {
            hash: None,
            indexed: false,
            indexed_at: None,
            discovered_at: Some(timestamp),
            imports: Vec::new(),
            node_ids: Vec::new(),
            node_count: 0,
        }
    }
}

/// One on-disk record per (file path, content hash).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheRecord {
    pub file_path: String,
    pub hash: String,
    pub indexed_at: String,
    pub nodes: Vec<CodeNode>,
    pub imports: Vec<String>,
}

/// Persistent file index plus per-file cache records.
pub struct MetadataStore {
    metadata_dir: PathBuf,
    index_path: PathBuf,
    /// Keyed by absolute file path. BTreeMap keeps index.json stable.
    pub index: BTreeMap<String, FileIndexEntry>,
}

impl MetadataStore {
    /// Open (or create) the store under `.auzoom/` of a project root.
    pub fn open(cache_dir: &Path) -> GraphResult<Self> {
        let metadata_dir = cache_dir.join("metadata");
        std::fs::create_dir_all(&metadata_dir).map_err(|e| GraphError::FileWrite {
            path: metadata_dir.clone(),
            source: e,
        })?;

        let index_path = cache_dir.join("index.json");
        let index = Self::load_index(&index_path);

        Ok(Self {
            metadata_dir,
            index_path,
            index,
        })
    }

    /// A corrupt or missing index is not an error: start empty and rebuild
    /// as files are parsed.
    fn load_index(index_path: &Path) -> BTreeMap<String, FileIndexEntry> {
        match std::fs::read_to_string(index_path) {
            Ok(text) => serde_json::from_str(&text).unwrap_or_else(|e| {
                tracing::warn!("Discarding unreadable index {}: {e}", index_path.display());
                BTreeMap::new()
            }),
            Err(_) => BTreeMap::new(),
        }
    }

    /// First 16 hex chars of SHA-256 over the file bytes.
    pub fn compute_hash(&self, path: &Path) -> GraphResult<String> {
        let bytes = std::fs::read(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                GraphError::FileNotFound {
                    path: path.to_path_buf(),
                }
            } else {
                GraphError::FileRead {
                    path: path.to_path_buf(),
                    source: e,
                }
            }
        })?;
        Ok(hash_bytes(&bytes))
    }

    pub fn timestamp(&self) -> String {
        Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    /// Load a cached record iff the file is indexed, the stored hash equals
    /// the current hash, and the record file exists and parses.
    pub fn load(&self, file_path: &str) -> Option<CacheRecord> {
        let entry = self.index.get(file_path)?;
        if !entry.indexed {
            return None;
        }
        let stored_hash = entry.hash.as_deref()?;

        let current_hash = self.compute_hash(Path::new(file_path)).ok()?;
        if current_hash != stored_hash {
            return None;
        }

        let record_path = self.record_path(file_path, stored_hash);
        let text = std::fs::read_to_string(&record_path).ok()?;
        serde_json::from_str(&text).ok()
    }

    /// Write the per-record file, update the index entry, and persist the
    /// index. The index write is atomic from a reader's point of view.
    pub fn save(
        &mut self,
        file_path: &str,
        hash: &str,
        nodes: &[CodeNode],
        imports: &[String],
    ) -> GraphResult<()> {
        let timestamp = self.timestamp();
        let record = CacheRecord {
            file_path: file_path.to_string(),
            hash: hash.to_string(),
            indexed_at: timestamp.clone(),
            nodes: nodes.to_vec(),
            imports: imports.to_vec(),
        };

        let record_path = self.record_path(file_path, hash);
        let json = serde_json::to_string_pretty(&record).map_err(|e| GraphError::CachePersist {
            path: record_path.clone(),
            reason: e.to_string(),
        })?;
        std::fs::write(&record_path, json).map_err(|e| GraphError::FileWrite {
            path: record_path,
            source: e,
        })?;

        let discovered_at = self
            .index
            .get(file_path)
            .and_then(|e| e.discovered_at.clone());
        self.index.insert(
            file_path.to_string(),
            FileIndexEntry {
                hash: Some(hash.to_string()),
                indexed: true,
                indexed_at: Some(timestamp),
                discovered_at,
                imports: imports.to_vec(),
                node_ids: nodes.iter().map(|n| n.id.clone()).collect(),
                node_count: nodes.len(),
            },
        );

        self.save_index()
    }

    /// Record a file discovered through an import reference but not yet
    /// parsed. Indexed entries are left untouched.
    pub fn discover(&mut self, file_path: &str) {
        if !self.index.contains_key(file_path) {
            let entry = FileIndexEntry::discovered(self.timestamp());
            self.index.insert(file_path.to_string(), entry);
        }
    }

    /// Persist the index via write-then-rename so a concurrent reader never
    /// sees a half-written file.
    pub fn save_index(&self) -> GraphResult<()> {
        let json =
            serde_json::to_string_pretty(&self.index).map_err(|e| GraphError::CachePersist {
                path: self.index_path.clone(),
                reason: e.to_string(),
            })?;

        let tmp_path = self.index_path.with_extension("json.tmp");
        std::fs::write(&tmp_path, json).map_err(|e| GraphError::FileWrite {
            path: tmp_path.clone(),
            source: e,
        })?;
        std::fs::rename(&tmp_path, &self.index_path).map_err(|e| GraphError::FileWrite {
            path: self.index_path.clone(),
            source: e,
        })?;

        Ok(())
    }

    pub fn indexed_count(&self) -> usize {
        self.index.values().filter(|e| e.indexed).count()
    }

    pub fn discovered_count(&self) -> usize {
        self.index.values().filter(|e| !e.indexed).count()
    }

    /// Paths known only through import references, oldest first.
    pub fn discovered_paths(&self) -> Vec<String> {
        let mut entries: Vec<(&String, &FileIndexEntry)> =
            self.index.iter().filter(|(_, e)| !e.indexed).collect();
        entries.sort_by(|a, b| a.1.discovered_at.cmp(&b.1.discovered_at));
        entries.into_iter().map(|(path, _)| path.clone()).collect()
    }

    fn record_path(&self, file_path: &str, hash: &str) -> PathBuf {
        let slug = file_path.replace(['/', '\\'], "_");
        self.metadata_dir.join(format!("{slug}_{hash}.json"))
    }
}

fn hash_bytes(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut hex = String::with_capacity(HASH_WIDTH);
    for byte in digest.iter().take(HASH_WIDTH / 2) {
        hex.push_str(&format!("{byte:02x}"));
    }
    hex
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NodeKind;
    use tempfile::TempDir;

    fn node(id: &str) -> CodeNode {
        CodeNode {
            id: id.to_string(),
            name: "f".to_string(),
            kind: NodeKind::Function,
            file_path: "/p/a.py".to_string(),
            line_start: 1,
            line_end: 2,
            dependents: vec![],
            children: vec![],
            docstring: None,
            signature: Some("f()".to_string()),
            source: Some("def f():\n    pass".to_string()),
        }
    }

    fn store_with_file(content: &str) -> (TempDir, MetadataStore, PathBuf) {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.py");
        std::fs::write(&file, content).unwrap();
        let store = MetadataStore::open(&dir.path().join(".auzoom")).unwrap();
        (dir, store, file)
    }

    #[test]
    fn test_hash_width_and_determinism() {
        let (_dir, store, file) = store_with_file("def f():\n    pass\n");
        let h1 = store.compute_hash(&file).unwrap();
        let h2 = store.compute_hash(&file).unwrap();
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 16);
        assert!(h1.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let (_dir, mut store, file) = store_with_file("def f():\n    pass\n");
        let path = file.to_string_lossy().to_string();
        let hash = store.compute_hash(&file).unwrap();
        let nodes = vec![node("/p/a.py::f")];

        store.save(&path, &hash, &nodes, &[]).unwrap();

        let record = store.load(&path).unwrap();
        assert_eq!(record.hash, hash);
        assert_eq!(record.nodes, nodes);

        let entry = store.index.get(&path).unwrap();
        assert!(entry.indexed);
        assert_eq!(entry.node_ids, vec!["/p/a.py::f"]);
        assert_eq!(entry.node_count, 1);
    }

    #[test]
    fn test_load_rejects_stale_hash() {
        let (_dir, mut store, file) = store_with_file("def f():\n    pass\n");
        let path = file.to_string_lossy().to_string();
        let hash = store.compute_hash(&file).unwrap();
        store.save(&path, &hash, &[node("/p/a.py::f")], &[]).unwrap();

        std::fs::write(&file, "def g():\n    pass\n").unwrap();
        assert!(store.load(&path).is_none());
    }

    #[test]
    fn test_load_unknown_path() {
        let (_dir, store, _file) = store_with_file("x = 1\n");
        assert!(store.load("/nowhere/else.py").is_none());
    }

    #[test]
    fn test_discover_does_not_clobber_indexed() {
        let (_dir, mut store, file) = store_with_file("def f():\n    pass\n");
        let path = file.to_string_lossy().to_string();
        let hash = store.compute_hash(&file).unwrap();
        store.save(&path, &hash, &[], &[]).unwrap();

        store.discover(&path);
        assert!(store.index.get(&path).unwrap().indexed);
    }

    #[test]
    fn test_discover_marks_unindexed() {
        let (_dir, mut store, _file) = store_with_file("x = 1\n");
        store.discover("/p/later.py");
        let entry = store.index.get("/p/later.py").unwrap();
        assert!(!entry.indexed);
        assert!(entry.discovered_at.is_some());
        assert_eq!(store.discovered_count(), 1);
        assert_eq!(store.indexed_count(), 0);
    }

    #[test]
    fn test_index_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.py");
        std::fs::write(&file, "def f():\n    pass\n").unwrap();
        let path = file.to_string_lossy().to_string();
        let cache_dir = dir.path().join(".auzoom");

        let hash = {
            let mut store = MetadataStore::open(&cache_dir).unwrap();
            let hash = store.compute_hash(&file).unwrap();
            store.save(&path, &hash, &[node("/p/a.py::f")], &[]).unwrap();
            hash
        };

        let store = MetadataStore::open(&cache_dir).unwrap();
        assert_eq!(store.index.get(&path).unwrap().hash.as_deref(), Some(hash.as_str()));
        assert!(store.load(&path).is_some());
    }

    #[test]
    fn test_corrupt_index_starts_empty() {
        let dir = TempDir::new().unwrap();
        let cache_dir = dir.path().join(".auzoom");
        std::fs::create_dir_all(&cache_dir).unwrap();
        std::fs::write(cache_dir.join("index.json"), "{not json").unwrap();

        let store = MetadataStore::open(&cache_dir).unwrap();
        assert!(store.index.is_empty());
    }
}
