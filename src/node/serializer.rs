//! File-level node serialization with optional field projection.

use serde_json::{Map, Value};

use crate::node::CodeNode;
use crate::types::{FetchLevel, NodeKind, OutputFormat};

/// Serialize node lists for tool responses.
pub struct NodeSerializer;

impl NodeSerializer {
    /// Serialize nodes at the requested level and format.
    ///
    /// `relative_to` rewrites compact ids relative to the project root.
    /// `fields` restricts output to exactly that key subset; unknown names
    /// are silently dropped. Filtering applies after the level has chosen
    /// the field set.
    pub fn serialize_file(
        nodes: &[&CodeNode],
        level: FetchLevel,
        format: OutputFormat,
        relative_to: Option<&str>,
        fields: Option<&[String]>,
    ) -> Vec<Map<String, Value>> {
        let serialized = nodes.iter().map(|node| match format {
            OutputFormat::Standard => node.at_level(level),
            OutputFormat::Compact => node.to_compact(relative_to, level),
        });

        match fields {
            Some(fields) => serialized.map(|map| filter_fields(map, fields)).collect(),
            None => serialized.collect(),
        }
    }

    /// Split a file's nodes into collapsed import names and code nodes.
    ///
    /// Imports are a disproportionate share of skeleton tokens, so a read
    /// response carries them as a plain string list instead of nodes.
    pub fn split_imports<'a>(nodes: Vec<&'a CodeNode>) -> (Vec<String>, Vec<&'a CodeNode>) {
        let mut imports = Vec::new();
        let mut code_nodes = Vec::new();
        for node in nodes {
            if node.kind == NodeKind::Import {
                imports.push(node.name.clone());
            } else {
                code_nodes.push(node);
            }
        }
        (imports, code_nodes)
    }
}

fn filter_fields(map: Map<String, Value>, fields: &[String]) -> Map<String, Value> {
    map.into_iter()
        .filter(|(key, _)| fields.iter().any(|f| f == key))
        .collect()
}
