//! Python parser built on tree-sitter.
//!
//! Extraction scope: module-level imports, module-level functions, classes,
//! and direct class methods. Nested functions and members of nested classes
//! are not extracted; this is a known scope limit, not an error.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use tree_sitter::{Node as TsNode, Parser};

use crate::error::{GraphError, GraphResult};
use crate::node::CodeNode;
use crate::parsing::MAX_AST_DEPTH;
use crate::types::NodeKind;

/// Parser for extracting Python code entities.
pub struct PythonParser {
    parser: Parser,
}

impl PythonParser {
    pub fn new() -> GraphResult<Self> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_python::LANGUAGE.into())
            .map_err(|e| GraphError::General(format!("Failed to set Python language: {e}")))?;

        Ok(Self { parser })
    }

    /// Parse a file and extract all code nodes.
    ///
    /// Node order: imports, then functions, then classes with their methods,
    /// each group in lexical order.
    pub fn parse_file(&mut self, path: &Path) -> GraphResult<Vec<CodeNode>> {
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
        let code = String::from_utf8(bytes).map_err(|_| GraphError::Parse {
            path: path.to_path_buf(),
            reason: "file is not valid UTF-8".to_string(),
        })?;

        self.parse_source(&code, &path.to_string_lossy())
    }

    /// Parse source text, attributing nodes to `file_path`.
    pub fn parse_source(&mut self, code: &str, file_path: &str) -> GraphResult<Vec<CodeNode>> {
        let tree = self.parser.parse(code, None).ok_or_else(|| GraphError::Parse {
            path: file_path.into(),
            reason: "tree-sitter returned no tree".to_string(),
        })?;

        let root = tree.root_node();
        let mut nodes = Vec::new();
        // Tree-sitter nodes for each function/method, kept alongside the
        // index of the produced CodeNode for the call-resolution pass.
        let mut callables: Vec<(usize, TsNode)> = Vec::new();

        self.extract_imports(root, code, file_path, &mut nodes);

        let mut cursor = root.walk();
        for child in root.children(&mut cursor) {
            let definition = unwrap_decorated(child);
            if definition.kind() == "function_definition" {
                if let Some(node) = self.create_function_node(
                    definition,
                    code,
                    file_path,
                    NodeKind::Function,
                    None,
                ) {
                    nodes.push(node);
                    callables.push((nodes.len() - 1, definition));
                }
            }
        }

        let mut cursor = root.walk();
        for child in root.children(&mut cursor) {
            let definition = unwrap_decorated(child);
            if definition.kind() == "class_definition" {
                self.extract_class(definition, code, file_path, &mut nodes, &mut callables);
            }
        }

        self.resolve_local_calls(code, &mut nodes, &callables);

        Ok(nodes)
    }

    /// Collect callee names from a source snippet.
    ///
    /// Used by the forward-calls tool, which reparses one node's stored
    /// source in isolation. Returns de-duplicated names in sorted order.
    pub fn find_call_names(&mut self, code: &str) -> Vec<String> {
        let Some(tree) = self.parser.parse(code, None) else {
            return Vec::new();
        };

        let mut calls = HashSet::new();
        collect_calls(tree.root_node(), code, &mut calls, 0);

        let mut names: Vec<String> = calls.into_iter().collect();
        names.sort();
        names
    }

    /// One Import node per bare module name in a top-level import statement.
    fn extract_imports(
        &self,
        root: TsNode,
        code: &str,
        file_path: &str,
        nodes: &mut Vec<CodeNode>,
    ) {
        let mut seen_ids = HashSet::new();
        let mut cursor = root.walk();
        for child in root.children(&mut cursor) {
            match child.kind() {
                "import_statement" => {
                    // `import a, b as c` produces one node per module
                    let mut inner = child.walk();
                    for part in child.children(&mut inner) {
                        let module = match part.kind() {
                            "dotted_name" => Some(node_text(part, code)),
                            "aliased_import" => part
                                .child_by_field_name("name")
                                .map(|name| node_text(name, code)),
                            _ => None,
                        };
                        if let Some(module) = module {
                            push_import(module, child, code, file_path, &mut seen_ids, nodes);
                        }
                    }
                }
                "import_from_statement" => {
                    // `from x.y import z` collapses to the module name `x.y`
                    if let Some(module_node) = child.child_by_field_name("module_name") {
                        let module = node_text(module_node, code);
                        push_import(module, child, code, file_path, &mut seen_ids, nodes);
                    }
                }
                _ => {}
            }
        }
    }

    fn extract_class<'tree>(
        &self,
        class_node: TsNode<'tree>,
        code: &str,
        file_path: &str,
        nodes: &mut Vec<CodeNode>,
        callables: &mut Vec<(usize, TsNode<'tree>)>,
    ) {
        let Some(name_node) = class_node.child_by_field_name("name") else {
            return;
        };
        let class_name = node_text(name_node, code);
        let body = class_node.child_by_field_name("body");

        // Direct method definitions, in lexical order
        let mut method_defs = Vec::new();
        if let Some(body) = body {
            let mut cursor = body.walk();
            for child in body.children(&mut cursor) {
                let definition = unwrap_decorated(child);
                if definition.kind() == "function_definition" {
                    method_defs.push(definition);
                }
            }
        }

        let children: Vec<String> = method_defs
            .iter()
            .filter_map(|def| def.child_by_field_name("name"))
            .map(|name| format!("{}::{}.{}", file_path, class_name, node_text(name, code)))
            .collect();

        nodes.push(CodeNode {
            id: format!("{file_path}::{class_name}"),
            name: class_name.clone(),
            kind: NodeKind::Class,
            file_path: file_path.to_string(),
            line_start: class_node.start_position().row + 1,
            line_end: class_node.end_position().row + 1,
            dependents: Vec::new(),
            children,
            docstring: extract_docstring(body, code),
            signature: None,
            source: Some(node_text(class_node, code)),
        });

        for def in method_defs {
            if let Some(node) = self.create_function_node(
                def,
                code,
                file_path,
                NodeKind::Method,
                Some(class_name.as_str()),
            ) {
                nodes.push(node);
                callables.push((nodes.len() - 1, def));
            }
        }
    }

    fn create_function_node(
        &self,
        def: TsNode,
        code: &str,
        file_path: &str,
        kind: NodeKind,
        class_name: Option<&str>,
    ) -> Option<CodeNode> {
        let name = node_text(def.child_by_field_name("name")?, code);
        let qualified = match class_name {
            Some(class_name) => format!("{class_name}.{name}"),
            None => name.clone(),
        };

        let signature = def
            .child_by_field_name("parameters")
            .map(|params| format!("{name}{}", node_text(params, code)));

        Some(CodeNode {
            id: format!("{file_path}::{qualified}"),
            name,
            kind,
            file_path: file_path.to_string(),
            line_start: def.start_position().row + 1,
            line_end: def.end_position().row + 1,
            dependents: Vec::new(),
            children: Vec::new(),
            docstring: extract_docstring(def.child_by_field_name("body"), code),
            signature,
            source: Some(node_text(def, code)),
        })
    }

    /// Populate reverse edges from same-file call sites.
    ///
    /// For every call whose callee name maps to another function or method
    /// in this file, the caller's id is appended to the callee's dependents.
    /// Cross-file calls are not resolved here; the reverse index is a
    /// lower bound.
    fn resolve_local_calls(
        &self,
        code: &str,
        nodes: &mut [CodeNode],
        callables: &[(usize, TsNode)],
    ) {
        let name_to_index: HashMap<String, usize> = nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| matches!(n.kind, NodeKind::Function | NodeKind::Method))
            .map(|(i, n)| (n.name.clone(), i))
            .collect();

        for &(caller_index, ts_node) in callables {
            let caller_id = nodes[caller_index].id.clone();

            let mut calls = HashSet::new();
            collect_calls(ts_node, code, &mut calls, 0);

            let mut targets: Vec<usize> = calls
                .iter()
                .filter_map(|name| name_to_index.get(name).copied())
                .filter(|&target| target != caller_index)
                .collect();
            targets.sort_unstable();

            for target in targets {
                nodes[target].add_dependent(&caller_id);
            }
        }
    }
}

/// Decorated definitions wrap the actual definition node.
fn unwrap_decorated(node: TsNode) -> TsNode {
    if node.kind() == "decorated_definition" {
        if let Some(definition) = node.child_by_field_name("definition") {
            return definition;
        }
    }
    node
}

fn node_text(node: TsNode, code: &str) -> String {
    code[node.byte_range()].to_string()
}

fn push_import(
    module: String,
    statement: TsNode,
    code: &str,
    file_path: &str,
    seen_ids: &mut HashSet<String>,
    nodes: &mut Vec<CodeNode>,
) {
    let id = format!("{file_path}::import::{module}");
    if !seen_ids.insert(id.clone()) {
        return;
    }

    nodes.push(CodeNode {
        id,
        name: module,
        kind: NodeKind::Import,
        file_path: file_path.to_string(),
        line_start: statement.start_position().row + 1,
        line_end: statement.end_position().row + 1,
        dependents: Vec::new(),
        children: Vec::new(),
        docstring: None,
        signature: None,
        source: Some(node_text(statement, code)),
    });
}

/// First string expression in a body block, outer quotes stripped.
fn extract_docstring(body: Option<TsNode>, code: &str) -> Option<String> {
    let body = body?;
    let mut cursor = body.walk();
    for child in body.children(&mut cursor) {
        if child.kind() == "expression_statement" {
            let mut inner = child.walk();
            for sub in child.children(&mut inner) {
                if sub.kind() == "string" {
                    return Some(strip_quotes(&node_text(sub, code)));
                }
            }
            // A non-string first expression means there is no docstring
            return None;
        }
    }
    None
}

fn strip_quotes(text: &str) -> String {
    let stripped = if (text.starts_with("\"\"\"") && text.ends_with("\"\"\"") && text.len() >= 6)
        || (text.starts_with("'''") && text.ends_with("'''") && text.len() >= 6)
    {
        &text[3..text.len() - 3]
    } else if (text.starts_with('"') && text.ends_with('"') && text.len() >= 2)
        || (text.starts_with('\'') && text.ends_with('\'') && text.len() >= 2)
    {
        &text[1..text.len() - 1]
    } else {
        text
    };
    stripped.trim().to_string()
}

/// Recursively collect callee names from call expressions.
///
/// A bare identifier callee records its name; an attribute callee `x.name`
/// records `name`.
fn collect_calls(node: TsNode, code: &str, calls: &mut HashSet<String>, depth: usize) {
    if depth > MAX_AST_DEPTH {
        return;
    }

    if node.kind() == "call" {
        if let Some(function) = node.child_by_field_name("function") {
            match function.kind() {
                "identifier" => {
                    calls.insert(node_text(function, code));
                }
                "attribute" => {
                    if let Some(attr) = function.child_by_field_name("attribute") {
                        calls.insert(node_text(attr, code));
                    }
                }
                _ => {}
            }
        }
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_calls(child, code, calls, depth + 1);
    }
}
