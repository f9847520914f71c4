//! Dependency traversal with strategy, direction, and kind filtering.
//!
//! Works over the graph's in-memory node map. Reverse neighbors come from
//! the stored `dependents` lists; forward neighbors are not stored and the
//! engine returns an empty forward set; forward analysis goes through the
//! `get_calls` tool instead.

use std::collections::{HashMap, HashSet, VecDeque};

use serde_json::{Map, Value, json};

use crate::node::CodeNode;
use crate::types::{NodeKind, TraversalDirection, TraversalStrategy};

#[derive(Debug, Clone)]
pub struct TraversalOptions {
    /// Maximum distance from the start node (1 = immediate neighbors).
    pub depth: usize,
    pub strategy: TraversalStrategy,
    pub direction: TraversalDirection,
    /// Nodes not matching are dropped from output but still traversed
    /// through: filtering is post-visit, not a walk restriction.
    pub kind_filter: Option<Vec<NodeKind>>,
    /// BFS only: resolve each depth level against the graph as one batch.
    pub batch_load: bool,
}

impl Default for TraversalOptions {
    fn default() -> Self {
        Self {
            depth: 1,
            strategy: TraversalStrategy::Bfs,
            direction: TraversalDirection::Reverse,
            kind_filter: None,
            batch_load: true,
        }
    }
}

/// BFS/DFS engine over the reverse dependency index.
pub struct TraversalEngine;

impl TraversalEngine {
    /// Traverse from `start_id`, returning skeleton records annotated with
    /// `depth` (0 for the start node) and `direction`.
    ///
    /// A visited set terminates cycles; no id is yielded twice. Lookup
    /// failures (dangling dependents after a reparse) are skipped silently.
    pub fn traverse(
        nodes: &HashMap<String, CodeNode>,
        start_id: &str,
        options: &TraversalOptions,
    ) -> Vec<Map<String, Value>> {
        match options.strategy {
            TraversalStrategy::Bfs => Self::bfs(nodes, start_id, options),
            TraversalStrategy::Dfs => Self::dfs(nodes, start_id, options),
        }
    }

    /// Level-by-level traversal: results grouped by increasing depth,
    /// insertion order of parents within a level.
    fn bfs(
        nodes: &HashMap<String, CodeNode>,
        start_id: &str,
        options: &TraversalOptions,
    ) -> Vec<Map<String, Value>> {
        let mut visited: HashSet<String> = HashSet::new();
        let mut result = Vec::new();
        let mut queue: VecDeque<(String, usize)> = VecDeque::new();
        queue.push_back((start_id.to_string(), 0));

        while !queue.is_empty() {
            let mut current_level: Vec<(String, usize)> = Vec::new();
            let mut next_queue: VecDeque<(String, usize)> = VecDeque::new();

            while let Some((node_id, depth)) = queue.pop_front() {
                if visited.contains(&node_id) || depth > options.depth {
                    continue;
                }
                visited.insert(node_id.clone());

                if depth < options.depth {
                    for neighbor in Self::neighbors(nodes, &node_id, options.direction) {
                        if !visited.contains(&neighbor) {
                            next_queue.push_back((neighbor, depth + 1));
                        }
                    }
                }
                current_level.push((node_id, depth));
            }

            if options.batch_load {
                // Resolve the whole level in one pass before emitting
                let loaded: Vec<(usize, Option<&CodeNode>)> = current_level
                    .iter()
                    .map(|(id, depth)| (*depth, nodes.get(id)))
                    .collect();
                for (depth, node) in loaded {
                    if let Some(node) = node {
                        Self::emit(node, depth, options, &mut result);
                    }
                }
            } else {
                for (node_id, depth) in current_level {
                    if let Some(node) = nodes.get(&node_id) {
                        Self::emit(node, depth, options, &mut result);
                    }
                }
            }

            queue = next_queue;
        }

        result
    }

    /// Depth-first traversal following dependents in insertion order.
    fn dfs(
        nodes: &HashMap<String, CodeNode>,
        start_id: &str,
        options: &TraversalOptions,
    ) -> Vec<Map<String, Value>> {
        let mut visited = HashSet::new();
        let mut result = Vec::new();
        Self::dfs_visit(nodes, start_id, 0, options, &mut visited, &mut result);
        result
    }

    fn dfs_visit(
        nodes: &HashMap<String, CodeNode>,
        node_id: &str,
        depth: usize,
        options: &TraversalOptions,
        visited: &mut HashSet<String>,
        result: &mut Vec<Map<String, Value>>,
    ) {
        if visited.contains(node_id) || depth > options.depth {
            return;
        }
        visited.insert(node_id.to_string());

        if let Some(node) = nodes.get(node_id) {
            Self::emit(node, depth, options, result);
        }

        if depth < options.depth {
            for neighbor in Self::neighbors(nodes, node_id, options.direction) {
                Self::dfs_visit(nodes, &neighbor, depth + 1, options, visited, result);
            }
        }
    }

    fn neighbors(
        nodes: &HashMap<String, CodeNode>,
        node_id: &str,
        direction: TraversalDirection,
    ) -> Vec<String> {
        let Some(node) = nodes.get(node_id) else {
            return Vec::new();
        };

        let mut neighbors = Vec::new();
        if matches!(
            direction,
            TraversalDirection::Reverse | TraversalDirection::Both
        ) {
            neighbors.extend(node.dependents.iter().cloned());
        }
        // Forward edges are not stored; the forward set is empty at
        // traversal time and answered by get_calls instead.
        neighbors
    }

    fn emit(
        node: &CodeNode,
        depth: usize,
        options: &TraversalOptions,
        result: &mut Vec<Map<String, Value>>,
    ) {
        if let Some(filter) = &options.kind_filter {
            if !filter.contains(&node.kind) {
                return;
            }
        }
        let mut record = node.to_skeleton();
        record.insert("depth".into(), json!(depth));
        record.insert("direction".into(), json!(options.direction.as_str()));
        result.push(record);
    }
}
