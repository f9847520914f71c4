//! The central node model with multi-level serialization.
//!
//! Only reverse dependencies (`dependents`) are stored. Forward dependencies
//! (what a node calls) are recomputed on demand by the `get_calls` tool,
//! which keeps skeleton responses small and avoids stale forward edges when
//! a callee moves or is renamed.

pub mod serializer;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::types::{FetchLevel, NodeKind};

/// Maximum docstring length carried by summary-level output.
const DOCSTRING_PREVIEW_BYTES: usize = 100;

/// One parsed code entity: function, method, class, or import.
///
/// `id` has the form `<absolute_file_path>::<qualified_name>`; for methods
/// the qualified name is `Class.method`, for imports `import::<module>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeNode {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub file_path: String,
    pub line_start: usize,
    pub line_end: usize,
    /// Node ids observed to call or refer to this node (reverse edges only).
    /// Ordered, de-duplicated, monotonically growing for the process life.
    #[serde(default)]
    pub dependents: Vec<String>,
    /// Node ids this node lexically contains (a class lists its methods).
    #[serde(default)]
    pub children: Vec<String>,
    pub docstring: Option<String>,
    /// Defined for functions and methods only: name plus parameter list.
    pub signature: Option<String>,
    /// Raw source text for the node's line range.
    pub source: Option<String>,
}

impl CodeNode {
    /// Append a dependent id, keeping the list de-duplicated.
    pub fn add_dependent(&mut self, id: &str) {
        if !self.dependents.iter().any(|d| d == id) {
            self.dependents.push(id.to_string());
        }
    }

    /// Skeleton view (~15 tokens): id, name, type, dependents.
    pub fn to_skeleton(&self) -> Map<String, Value> {
        let mut result = Map::new();
        result.insert("id".into(), json!(self.id));
        result.insert("name".into(), json!(self.name));
        result.insert("type".into(), json!(self.kind.as_str()));
        result.insert("dependents".into(), json!(self.dependents));
        result
    }

    /// Summary view (~75 tokens): skeleton + signature + truncated
    /// docstring + line range.
    pub fn to_summary(&self) -> Map<String, Value> {
        let mut result = self.to_skeleton();

        if let Some(sig) = &self.signature {
            result.insert("signature".into(), json!(sig));
        }
        if let Some(doc) = &self.docstring {
            result.insert("docstring".into(), json!(truncate_docstring(doc)));
        }
        result.insert("line_start".into(), json!(self.line_start));
        result.insert("line_end".into(), json!(self.line_end));

        result
    }

    /// Full view (~400 tokens): summary + full docstring + children +
    /// file path + source.
    pub fn to_full(&self) -> Map<String, Value> {
        let mut result = self.to_summary();

        if let Some(doc) = &self.docstring {
            result.insert("docstring".into(), json!(doc));
        }
        result.insert("children".into(), json!(self.children));
        result.insert("file_path".into(), json!(self.file_path));
        if let Some(source) = &self.source {
            result.insert("source".into(), json!(source));
        }

        result
    }

    /// Compact view: short keys, kind shortcodes, and project-relative ids.
    /// Skeleton level is 40-50% smaller than the standard format.
    pub fn to_compact(&self, relative_to: Option<&str>, level: FetchLevel) -> Map<String, Value> {
        let node_id = match relative_to {
            Some(root) if self.id.starts_with(root) => {
                self.id[root.len()..].trim_start_matches('/').to_string()
            }
            _ => self.id.clone(),
        };

        let mut result = Map::new();
        result.insert("i".into(), json!(node_id));
        result.insert("n".into(), json!(self.name));
        result.insert("t".into(), json!(self.kind.shortcode()));
        result.insert("r".into(), json!(self.dependents));

        if level >= FetchLevel::Summary {
            if let Some(sig) = &self.signature {
                result.insert("s".into(), json!(sig));
            }
            if let Some(doc) = &self.docstring {
                result.insert("doc".into(), json!(truncate_docstring(doc)));
            }
            result.insert("ls".into(), json!(self.line_start));
            result.insert("le".into(), json!(self.line_end));
        }

        if level == FetchLevel::Full {
            if let Some(doc) = &self.docstring {
                result.insert("doc".into(), json!(doc));
            }
            result.insert("c".into(), json!(self.children));
            result.insert("fp".into(), json!(self.file_path));
            if let Some(source) = &self.source {
                result.insert("src".into(), json!(source));
            }
        }

        result
    }

    /// Serialize at the requested level, standard format.
    pub fn at_level(&self, level: FetchLevel) -> Map<String, Value> {
        match level {
            FetchLevel::Skeleton => self.to_skeleton(),
            FetchLevel::Summary => self.to_summary(),
            FetchLevel::Full => self.to_full(),
        }
    }
}

/// Truncate a docstring to the preview budget at a char boundary, with an
/// ellipsis when anything was dropped.
fn truncate_docstring(doc: &str) -> String {
    if doc.len() <= DOCSTRING_PREVIEW_BYTES {
        return doc.to_string();
    }
    let mut boundary = DOCSTRING_PREVIEW_BYTES;
    while boundary > 0 && !doc.is_char_boundary(boundary) {
        boundary -= 1;
    }
    format!("{}...", &doc[..boundary])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_node() -> CodeNode {
        CodeNode {
            id: "/proj/src/auth.py::login".to_string(),
            name: "login".to_string(),
            kind: NodeKind::Function,
            file_path: "/proj/src/auth.py".to_string(),
            line_start: 10,
            line_end: 25,
            dependents: vec!["/proj/src/api.py::handle".to_string()],
            children: vec![],
            docstring: Some("Authenticate a user against the session store.".to_string()),
            signature: Some("login(user, password)".to_string()),
            source: Some("def login(user, password):\n    ...".to_string()),
        }
    }

    #[test]
    fn test_skeleton_fields() {
        let skel = sample_node().to_skeleton();
        let keys: Vec<&str> = skel.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["id", "name", "type", "dependents"]);
        assert_eq!(skel["type"], "function");
        assert_eq!(skel["dependents"][0], "/proj/src/api.py::handle");
    }

    #[test]
    fn test_summary_is_superset_of_skeleton() {
        let node = sample_node();
        let skel = node.to_skeleton();
        let summary = node.to_summary();
        for key in skel.keys() {
            assert!(summary.contains_key(key), "summary missing {key}");
        }
        assert_eq!(summary["signature"], "login(user, password)");
        assert_eq!(summary["line_start"], 10);
        assert_eq!(summary["line_end"], 25);
    }

    #[test]
    fn test_full_is_superset_of_summary() {
        let node = sample_node();
        let summary = node.to_summary();
        let full = node.to_full();
        for key in summary.keys() {
            assert!(full.contains_key(key), "full missing {key}");
        }
        assert!(full.contains_key("source"));
        assert!(full.contains_key("children"));
        assert_eq!(full["file_path"], "/proj/src/auth.py");
    }

    #[test]
    fn test_summary_truncates_long_docstring() {
        let mut node = sample_node();
        node.docstring = Some("x".repeat(250));
        let summary = node.to_summary();
        let doc = summary["docstring"].as_str().unwrap();
        assert_eq!(doc.len(), 103); // 100 chars + "..."
        assert!(doc.ends_with("..."));

        // Full level restores the whole docstring
        let full = node.to_full();
        assert_eq!(full["docstring"].as_str().unwrap().len(), 250);
    }

    #[test]
    fn test_docstring_truncation_respects_char_boundary() {
        let mut node = sample_node();
        node.docstring = Some(format!("{}é{}", "x".repeat(99), "y".repeat(50)));
        let summary = node.to_summary();
        // Must not panic and must stay under budget plus ellipsis
        let doc = summary["docstring"].as_str().unwrap();
        assert!(doc.ends_with("..."));
    }

    #[test]
    fn test_compact_skeleton_keys() {
        let compact = sample_node().to_compact(Some("/proj"), FetchLevel::Skeleton);
        let keys: Vec<&str> = compact.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["i", "n", "t", "r"]);
        assert_eq!(compact["t"], "f");
        assert_eq!(compact["i"], "src/auth.py::login");
    }

    #[test]
    fn test_compact_full_includes_source() {
        let compact = sample_node().to_compact(None, FetchLevel::Full);
        assert!(compact.contains_key("src"));
        assert!(compact.contains_key("fp"));
        assert!(compact.contains_key("c"));
        assert_eq!(compact["i"], "/proj/src/auth.py::login");
    }

    #[test]
    fn test_compact_inverts_to_standard_keys() {
        let node = sample_node();
        let compact = node.to_compact(None, FetchLevel::Skeleton);
        let standard = node.to_skeleton();

        assert_eq!(compact["i"], standard["id"]);
        assert_eq!(compact["n"], standard["name"]);
        assert_eq!(compact["r"], standard["dependents"]);
        let kind: NodeKind = standard["type"].as_str().unwrap().parse().unwrap();
        assert_eq!(compact["t"], kind.shortcode());
    }

    #[test]
    fn test_add_dependent_deduplicates() {
        let mut node = sample_node();
        node.add_dependent("/proj/src/api.py::handle");
        node.add_dependent("/proj/src/cli.py::main");
        node.add_dependent("/proj/src/cli.py::main");
        assert_eq!(node.dependents.len(), 2);
    }

    #[test]
    fn test_serde_round_trip() {
        let node = sample_node();
        let text = serde_json::to_string(&node).unwrap();
        assert!(text.contains("\"type\":\"function\""));
        let back: CodeNode = serde_json::from_str(&text).unwrap();
        assert_eq!(node, back);
    }
}
