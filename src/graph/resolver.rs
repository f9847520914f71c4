//! Import resolution: textual import references to project file paths.
//!
//! The resolver only turns references like `from foo.bar import x` into
//! candidate paths for the discovery set; it never reads the target.

use std::path::{Path, PathBuf};

use crate::node::CodeNode;
use crate::types::NodeKind;

pub struct ImportResolver {
    project_root: PathBuf,
}

impl ImportResolver {
    pub fn new(project_root: PathBuf) -> Self {
        Self { project_root }
    }

    /// Resolve every import node to an absolute path inside the project.
    /// Unresolvable references are skipped.
    pub fn extract_imports(&self, nodes: &[CodeNode]) -> Vec<String> {
        let mut imports = Vec::new();
        for node in nodes {
            if node.kind == NodeKind::Import {
                if let Some(resolved) = self.resolve(&node.name, Path::new(&node.file_path)) {
                    if !imports.contains(&resolved) {
                        imports.push(resolved);
                    }
                }
            }
        }
        imports
    }

    /// Convert one import reference to a file path.
    ///
    /// Relative references resolve against the importing file's directory;
    /// absolute references try `<root>/src/` then `<root>/`.
    pub fn resolve(&self, import_name: &str, from_file: &Path) -> Option<String> {
        let candidate = if import_name.starts_with('.') {
            let base_dir = from_file.parent()?;
            let stripped = import_name.trim_start_matches('.');
            base_dir.join(format!("{stripped}.py"))
        } else {
            let relative: PathBuf = import_name.split('.').collect();
            let mut candidate = self
                .project_root
                .join("src")
                .join(&relative)
                .with_extension("py");
            if !candidate.exists() {
                candidate = self.project_root.join(&relative).with_extension("py");
            }
            candidate
        };

        if candidate.exists() {
            candidate
                .canonicalize()
                .ok()
                .map(|p| p.to_string_lossy().to_string())
        } else {
            None
        }
    }
}
