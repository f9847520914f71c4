//! Higher-level query operations over the lazy graph.

use serde_json::{Map, Value};

use crate::graph::lazy::LazyGraph;
use crate::graph::traversal::{TraversalEngine, TraversalOptions};
use crate::types::FetchLevel;

impl LazyGraph {
    /// Traverse the dependency index from a node.
    ///
    /// The start node's file is loaded on demand; an unknown id yields an
    /// empty list rather than an error, as does `depth == 0`.
    pub fn get_dependencies(
        &mut self,
        node_id: &str,
        options: &TraversalOptions,
    ) -> Vec<Map<String, Value>> {
        if options.depth < 1 {
            return Vec::new();
        }

        if self.ensure_node(node_id).is_err() {
            return Vec::new();
        }

        TraversalEngine::traverse(&self.nodes, node_id, options)
    }

    /// Serialize a node's children at a level. Dangling child ids are
    /// skipped.
    pub fn get_children(
        &mut self,
        node_id: &str,
        level: FetchLevel,
    ) -> Vec<Map<String, Value>> {
        let child_ids = match self.ensure_node(node_id) {
            Ok(node) => node.children.clone(),
            Err(_) => return Vec::new(),
        };

        child_ids
            .iter()
            .filter_map(|id| self.get_node(id, level).ok())
            .collect()
    }
}
