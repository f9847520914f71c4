//! Tool semantics: JSON arguments in, JSON payload out.
//!
//! Every operation returns an `{error, type?}` object on failure instead of
//! propagating; parser failures are caught exactly once here and converted
//! to a fallback payload carrying the raw file text. The same dispatcher
//! backs both the stdio server and the embedded one-shot CLI mode.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::{Map, Value, json};

use crate::cache::CacheWarmer;
use crate::config::Settings;
use crate::error::{GraphError, GraphResult};
use crate::graph::{LazyGraph, TraversalOptions};
use crate::mcp::summarizer::FileSummarizer;
use crate::parsing::PythonParser;
use crate::types::{
    FetchLevel, NodeKind, OutputFormat, TraversalDirection, TraversalStrategy, estimate_tokens,
};

/// Container owning the graph, summarizer, and settings; built once at
/// startup and passed to the transport layer explicitly.
pub struct ToolDispatcher {
    project_root: PathBuf,
    graph: Arc<RwLock<LazyGraph>>,
    summarizer: FileSummarizer,
    settings: Arc<Settings>,
}

impl ToolDispatcher {
    pub fn new(project_root: &Path, settings: Arc<Settings>) -> GraphResult<Self> {
        let project_root = project_root
            .canonicalize()
            .map_err(|_| GraphError::FileNotFound {
                path: project_root.to_path_buf(),
            })?;

        let graph = Arc::new(RwLock::new(LazyGraph::new(&project_root)?));
        let summarizer = FileSummarizer::new(project_root.join(".auzoom").join("summaries"));

        if settings.auto_warm {
            CacheWarmer::new(project_root.clone(), graph.clone(), settings.clone()).spawn();
        }

        Ok(Self {
            project_root,
            graph,
            summarizer,
            settings,
        })
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Route a tool call by name. Unknown names are an error payload, not a
    /// transport failure.
    pub fn dispatch(&self, tool_name: &str, args: &Value) -> Value {
        match tool_name {
            "read" => self.read(args),
            "find" => self.find(args),
            "get_dependencies" => self.get_dependencies(args),
            "get_calls" => self.get_calls(args),
            "stats" => self.stats(),
            _ => json!({"error": format!("Unknown tool: {tool_name}")}),
        }
    }

    /// The main file reading tool.
    pub fn read(&self, args: &Value) -> Value {
        let Some(path) = args.get("path").and_then(Value::as_str) else {
            return json!({"error": "path parameter required"});
        };

        let mut file_path = PathBuf::from(path);
        if !file_path.is_absolute() {
            file_path = self.project_root.join(path);
        }
        if !file_path.exists() {
            return json!({"error": format!("File not found: {path}")});
        }

        let level_str = args
            .get("level")
            .and_then(Value::as_str)
            .unwrap_or("skeleton");

        if file_path.extension().and_then(|e| e.to_str()) == Some("py") {
            self.read_python(&file_path, level_str, args)
        } else {
            self.read_non_python(&file_path, level_str, args)
        }
    }

    fn read_python(&self, file_path: &Path, level_str: &str, args: &Value) -> Value {
        let content = match std::fs::read_to_string(file_path) {
            Ok(content) => content,
            Err(e) => {
                return json!({
                    "error": format!("Failed to read file '{}': {e}", file_path.display()),
                    "type": "file_read",
                });
            }
        };

        // Small-file bypass: parsing buys nothing below the threshold
        let line_count = content.lines().count();
        let estimated = line_count * 4;
        if estimated < self.settings.small_file_threshold {
            return json!({
                "type": "small_file_bypass",
                "file_path": file_path.to_string_lossy(),
                "content": content,
                "note": format!(
                    "File below {} token threshold ({estimated} estimated)",
                    self.settings.small_file_threshold
                ),
                "level": "full",
            });
        }

        let Ok(level) = FetchLevel::from_str(level_str) else {
            return json!({"error": format!("Invalid level: {level_str}")});
        };

        let format = match args.get("format").and_then(Value::as_str) {
            Some(format_str) => match OutputFormat::from_str(format_str) {
                Ok(format) => format,
                Err(()) => return json!({"error": format!("Invalid format: {format_str}")}),
            },
            None if self.settings.compact_format => OutputFormat::Compact,
            None => OutputFormat::Standard,
        };

        let fields: Option<Vec<String>> = if self.settings.field_selection {
            args.get("fields").and_then(Value::as_array).map(|list| {
                list.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
        } else {
            None
        };

        let mut graph = self.graph.write();
        let cached = graph.is_loaded(file_path);
        match graph.get_file(file_path, level, format, fields.as_deref()) {
            Ok((imports, nodes)) => {
                let body = json!({"imports": imports, "nodes": nodes});
                let token_estimate = estimate_tokens(&body.to_string());
                json!({
                    "type": "python",
                    "file_path": file_path.to_string_lossy(),
                    "level": level_str,
                    "format": format.as_str(),
                    "imports": body["imports"],
                    "nodes": body["nodes"],
                    "node_count": body["nodes"].as_array().map_or(0, |n| n.len()),
                    "import_count": body["imports"].as_array().map_or(0, |n| n.len()),
                    "cached": cached,
                    "token_estimate": token_estimate,
                })
            }
            Err(e @ GraphError::Parse { .. }) => json!({
                "type": "python_fallback",
                "file_path": file_path.to_string_lossy(),
                "error": format!("Parse failed: {e}"),
                "content": content,
                "level": "full",
            }),
            Err(e) => json!({"error": e.to_string(), "type": e.kind()}),
        }
    }

    /// Non-Python files: full content on demand, cached summary otherwise.
    fn read_non_python(&self, file_path: &Path, level_str: &str, args: &Value) -> Value {
        let content = match std::fs::read_to_string(file_path) {
            Ok(content) => content,
            Err(e) => {
                return json!({
                    "error": format!("Failed to read file '{}': {e}", file_path.display()),
                    "type": "file_read",
                });
            }
        };
        let cached_summary = self.summarizer.load_cached(file_path);

        if level_str == "full" {
            let lines: Vec<&str> = content.lines().collect();
            let offset = args.get("offset").and_then(Value::as_u64).map(|v| v as usize);
            let limit = args.get("limit").and_then(Value::as_u64).map(|v| v as usize);
            let windowed: Vec<&str> = match (offset, limit) {
                (None, None) => lines,
                (offset, limit) => lines
                    .into_iter()
                    .skip(offset.unwrap_or(0))
                    .take(limit.unwrap_or(usize::MAX))
                    .collect(),
            };
            let line_count = windowed.len();
            let window_content = windowed.join("\n");

            if cached_summary.is_none() {
                self.summarizer
                    .schedule_summarization(file_path.to_path_buf(), content);
            }
            return json!({
                "type": "full_content",
                "file_path": file_path.to_string_lossy(),
                "content": window_content,
                "line_count": line_count,
                "level": "full",
            });
        }

        if let Some(summary) = cached_summary {
            return json!({
                "type": "cached_summary",
                "file_path": file_path.to_string_lossy(),
                "level": level_str,
                "summary": summary.get("summary").cloned().unwrap_or(Value::Null),
                "file_type": summary.get("file_type").cloned().unwrap_or(Value::Null),
                "line_count": summary.get("line_count").cloned().unwrap_or(json!(0)),
                "size_bytes": summary.get("size_bytes").cloned().unwrap_or(json!(0)),
                "cached": true,
                "note": "Use level='full' for complete content",
            });
        }

        // First access: return everything and cache a summary for later
        let line_count = content.lines().count();
        self.summarizer
            .schedule_summarization(file_path.to_path_buf(), content.clone());
        json!({
            "type": "full_content_first_access",
            "file_path": file_path.to_string_lossy(),
            "content": content,
            "line_count": line_count,
            "level": "full",
            "cached": false,
            "note": "First access - summary will be cached for future reads",
        })
    }

    /// Search loaded nodes by name pattern.
    pub fn find(&self, args: &Value) -> Value {
        let Some(pattern) = args.get("pattern").and_then(Value::as_str) else {
            return json!({"error": "pattern parameter required"});
        };

        let matches = self.graph.read().find_by_name(pattern);
        let count = matches.len();
        json!({"matches": matches, "count": count})
    }

    /// Reverse (or forward) dependency traversal from a node.
    pub fn get_dependencies(&self, args: &Value) -> Value {
        let Some(node_id) = args.get("node_id").and_then(Value::as_str) else {
            return json!({"error": "node_id parameter required"});
        };

        let depth = args.get("depth").and_then(Value::as_u64).unwrap_or(1) as usize;
        let strategy = args
            .get("strategy")
            .and_then(Value::as_str)
            .and_then(|s| TraversalStrategy::from_str(&s.to_lowercase()).ok())
            .unwrap_or(TraversalStrategy::Bfs);
        let direction = args
            .get("direction")
            .and_then(Value::as_str)
            .and_then(|s| TraversalDirection::from_str(&s.to_lowercase()).ok())
            .unwrap_or(TraversalDirection::Reverse);

        let kind_filter: Option<Vec<NodeKind>> = args
            .get("node_types")
            .and_then(Value::as_array)
            .map(|list| {
                list.iter()
                    .filter_map(Value::as_str)
                    .filter_map(|s| NodeKind::from_str(s).ok())
                    .collect::<Vec<_>>()
            })
            .filter(|kinds: &Vec<NodeKind>| !kinds.is_empty());

        let options = TraversalOptions {
            depth,
            strategy,
            direction,
            kind_filter,
            batch_load: true,
        };

        let dependencies = self.graph.write().get_dependencies(node_id, &options);
        let count = dependencies.len();
        json!({
            "node_id": node_id,
            "dependencies": dependencies,
            "count": count,
            "strategy": strategy.as_str(),
            "direction": direction.as_str(),
            "note": "Use strategy='bfs' for impact analysis (show all callers level-by-level). \
                     Forward call chains are answered by get_calls.",
        })
    }

    /// Forward dependencies on demand: reparse one node's stored source.
    pub fn get_calls(&self, args: &Value) -> Value {
        let Some(node_id) = args.get("node_id").and_then(Value::as_str) else {
            return json!({"error": "node_id parameter required"});
        };

        let source = {
            let mut graph = self.graph.write();
            match graph.ensure_node(node_id) {
                Ok(node) => node.source.clone(),
                Err(GraphError::NodeNotFound { .. }) => {
                    return json!({"error": format!("Node not found: {node_id}")});
                }
                Err(e) => return json!({"error": e.to_string(), "type": e.kind()}),
            }
        };

        let calls = match source {
            Some(source) => match PythonParser::new() {
                Ok(mut parser) => parser.find_call_names(&source),
                Err(e) => return json!({"error": e.to_string(), "type": e.kind()}),
            },
            None => Vec::new(),
        };

        let count = calls.len();
        json!({
            "node_id": node_id,
            "calls": calls,
            "count": count,
            "cost_estimate_tokens": 150,
            "note": "Computed on-demand from source code (not cached). Use sparingly - \
                     most cases only need reverse deps from get_dependencies.",
        })
    }

    /// Cache performance statistics.
    pub fn stats(&self) -> Value {
        let mut stats: Map<String, Value> = self.graph.read().stats();
        stats.insert(
            "non_python_summaries_cached".into(),
            json!(self.summarizer.cached_count()),
        );
        Value::Object(stats)
    }
}
