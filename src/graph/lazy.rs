//! Lazy, cache-backed code graph.
//!
//! Flow for `get_file`:
//! 1. already in memory -> cache hit
//! 2. on disk with matching content hash -> cache hit, hydrate
//! 3. parse now, persist record, discover imports -> cache miss

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value, json};

use crate::cache::MetadataStore;
use crate::error::{GraphError, GraphResult};
use crate::node::{CodeNode, serializer::NodeSerializer};
use crate::parsing::PythonParser;
use crate::graph::resolver::ImportResolver;
use crate::types::{FetchLevel, OutputFormat};

#[derive(Debug, Default, Clone, Copy)]
pub struct GraphStats {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub parses: u64,
}

/// Graph that indexes files on demand with persistent caching.
///
/// Exclusively owns all nodes and the file index. Mutating entry points are
/// expected to be serialized by the caller (one coarse lock around the whole
/// graph is sufficient; see the server container).
pub struct LazyGraph {
    project_root: PathBuf,
    /// Arena of all loaded nodes, keyed by id. Dangling ids in `dependents`
    /// or `children` lists are tolerated and skipped on lookup.
    pub(crate) nodes: HashMap<String, CodeNode>,
    /// In-memory residency: file path -> ids parsed or hydrated from cache.
    file_nodes: HashMap<String, Vec<String>>,
    store: MetadataStore,
    resolver: ImportResolver,
    stats: GraphStats,
}

impl LazyGraph {
    pub fn new(project_root: &Path) -> GraphResult<Self> {
        let project_root = project_root
            .canonicalize()
            .map_err(|_| GraphError::FileNotFound {
                path: project_root.to_path_buf(),
            })?;

        let cache_dir = project_root.join(".auzoom");
        let store = MetadataStore::open(&cache_dir)?;

        Ok(Self {
            nodes: HashMap::new(),
            file_nodes: HashMap::new(),
            store,
            resolver: ImportResolver::new(project_root.clone()),
            stats: GraphStats::default(),
            project_root,
        })
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Whether a file's nodes are resident in memory.
    pub fn is_loaded(&self, path: &Path) -> bool {
        match path.canonicalize() {
            Ok(canonical) => self
                .file_nodes
                .contains_key(canonical.to_string_lossy().as_ref()),
            Err(_) => false,
        }
    }

    /// Get a file's collapsed import names and serialized code nodes,
    /// parsing lazily if needed.
    pub fn get_file(
        &mut self,
        path: &Path,
        level: FetchLevel,
        format: OutputFormat,
        fields: Option<&[String]>,
    ) -> GraphResult<(Vec<String>, Vec<Map<String, Value>>)> {
        let canonical = path.canonicalize().map_err(|_| GraphError::FileNotFound {
            path: path.to_path_buf(),
        })?;
        let file_path = canonical.to_string_lossy().to_string();

        // 1. Already in memory, and the bytes have not changed since the
        // last parse? The hash is validated on every read.
        if self.file_nodes.contains_key(&file_path) && self.is_current(&canonical, &file_path) {
            self.stats.cache_hits += 1;
            return Ok(self.serialize_file(&file_path, level, format, fields));
        }

        // 2. On disk with a valid hash?
        if !self.file_nodes.contains_key(&file_path) {
            if let Some(record) = self.store.load(&file_path) {
                self.stats.cache_hits += 1;
                self.hydrate(record.nodes, &file_path);
                return Ok(self.serialize_file(&file_path, level, format, fields));
            }
        }

        // 3. Parse now (first access or stale)
        self.stats.cache_misses += 1;
        self.parse_and_cache(&canonical, &file_path)?;
        Ok(self.serialize_file(&file_path, level, format, fields))
    }

    /// Any hash change means the resident nodes are stale and a full
    /// reparse is required. A missing index entry (e.g. after a failed
    /// cache write) also forces a reparse.
    fn is_current(&self, path: &Path, file_path: &str) -> bool {
        let Some(stored) = self.store.index.get(file_path).and_then(|e| e.hash.as_deref()) else {
            return false;
        };
        match self.store.compute_hash(path) {
            Ok(current) => current == stored,
            Err(_) => false,
        }
    }

    /// Parsers hold grammar state that is not shareable across threads, so
    /// one is created per parse rather than stored in the graph.
    fn parse_and_cache(&mut self, path: &Path, file_path: &str) -> GraphResult<()> {
        self.stats.parses += 1;
        let nodes = PythonParser::new()?.parse_file(path)?;

        let imports = self.resolver.extract_imports(&nodes);
        let hash = self.store.compute_hash(path)?;

        // Cache write failures must not fail the read: the in-memory graph
        // is the source of truth for the caller.
        if let Err(e) = self.store.save(file_path, &hash, &nodes, &imports) {
            tracing::warn!("Failed to persist cache record for {file_path}: {e}");
        }
        for import in &imports {
            self.store.discover(import);
        }
        if let Err(e) = self.store.save_index() {
            tracing::warn!("Failed to persist index: {e}");
        }

        self.register(nodes, file_path);
        Ok(())
    }

    /// Replace a file's nodes in memory. Same ids overwrite; ids that
    /// disappeared are dropped, leaving dangling references in other nodes'
    /// dependents lists; consumers treat missing lookups as "skip".
    fn register(&mut self, nodes: Vec<CodeNode>, file_path: &str) {
        if let Some(old_ids) = self.file_nodes.remove(file_path) {
            for id in old_ids {
                self.nodes.remove(&id);
            }
        }

        let mut node_ids = Vec::with_capacity(nodes.len());
        for node in nodes {
            node_ids.push(node.id.clone());
            self.nodes.insert(node.id.clone(), node);
        }
        self.file_nodes.insert(file_path.to_string(), node_ids);
    }

    fn hydrate(&mut self, nodes: Vec<CodeNode>, file_path: &str) {
        self.register(nodes, file_path);
    }

    fn serialize_file(
        &self,
        file_path: &str,
        level: FetchLevel,
        format: OutputFormat,
        fields: Option<&[String]>,
    ) -> (Vec<String>, Vec<Map<String, Value>>) {
        let all_nodes: Vec<&CodeNode> = self
            .file_nodes
            .get(file_path)
            .map(|ids| ids.iter().filter_map(|id| self.nodes.get(id)).collect())
            .unwrap_or_default();

        let (imports, code_nodes) = NodeSerializer::split_imports(all_nodes);
        let root = self.project_root.to_string_lossy();
        let serialized =
            NodeSerializer::serialize_file(&code_nodes, level, format, Some(root.as_ref()), fields);

        (imports, serialized)
    }

    /// Resolve a node id to a loaded node, parsing the file implied by the
    /// id prefix if necessary.
    pub fn ensure_node(&mut self, node_id: &str) -> GraphResult<&CodeNode> {
        if !self.nodes.contains_key(node_id) {
            let file_path = node_id.split("::").next().unwrap_or_default().to_string();
            self.get_file(
                Path::new(&file_path),
                FetchLevel::Skeleton,
                OutputFormat::Standard,
                None,
            )?;
        }

        self.nodes.get(node_id).ok_or_else(|| GraphError::NodeNotFound {
            id: node_id.to_string(),
        })
    }

    /// Serialize one node at a level, loading its file on demand.
    pub fn get_node(&mut self, node_id: &str, level: FetchLevel) -> GraphResult<Map<String, Value>> {
        Ok(self.ensure_node(node_id)?.at_level(level))
    }

    /// Case-insensitive substring match over the names of loaded nodes.
    /// Does not load new files.
    pub fn find_by_name(&self, pattern: &str) -> Vec<Map<String, Value>> {
        let needle = pattern.to_lowercase();
        let mut matches: Vec<&CodeNode> = self
            .nodes
            .values()
            .filter(|node| node.name.to_lowercase().contains(&needle))
            .collect();
        matches.sort_by(|a, b| a.id.cmp(&b.id));
        matches.into_iter().map(|node| node.to_skeleton()).collect()
    }

    /// Files known through import references but not yet parsed.
    pub fn discovered_files(&self) -> Vec<String> {
        self.store.discovered_paths()
    }

    pub fn stats(&self) -> Map<String, Value> {
        let total = self.stats.cache_hits + self.stats.cache_misses;
        let hit_rate = if total > 0 {
            self.stats.cache_hits as f64 / total as f64
        } else {
            0.0
        };

        let mut result = Map::new();
        result.insert("cache_hits".into(), json!(self.stats.cache_hits));
        result.insert("cache_misses".into(), json!(self.stats.cache_misses));
        result.insert("hit_rate".into(), json!(format!("{:.1}%", hit_rate * 100.0)));
        result.insert("files_parsed".into(), json!(self.stats.parses));
        result.insert("files_indexed".into(), json!(self.store.indexed_count()));
        result.insert(
            "files_discovered".into(),
            json!(self.store.discovered_count()),
        );
        result.insert("nodes_in_memory".into(), json!(self.nodes.len()));
        result
    }

    pub fn raw_stats(&self) -> GraphStats {
        self.stats
    }
}
