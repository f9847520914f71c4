//! Background cache warming and entry point discovery.
//!
//! The warmer only goes through the graph's public entry points and relies
//! on the graph's lock for coordination. Warming is best-effort: a failure
//! on one file is logged and does not stop the sequence.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use walkdir::WalkDir;

use crate::config::Settings;
use crate::graph::LazyGraph;
use crate::types::{FetchLevel, OutputFormat};

/// File names conventionally used as project entry points.
const ENTRY_POINT_NAMES: &[&str] = &[
    "main.py",
    "app.py",
    "__main__.py",
    "manage.py",
    "run.py",
    "server.py",
    "cli.py",
];

/// Directories never worth scanning.
const SKIP_DIRS: &[&str] = &["venv", "node_modules", "__pycache__"];

/// Maximum entry point candidates warmed at startup.
const MAX_CANDIDATES: usize = 5;

pub struct CacheWarmer {
    project_root: PathBuf,
    graph: Arc<RwLock<LazyGraph>>,
    settings: Arc<Settings>,
}

impl CacheWarmer {
    pub fn new(
        project_root: PathBuf,
        graph: Arc<RwLock<LazyGraph>>,
        settings: Arc<Settings>,
    ) -> Self {
        Self {
            project_root,
            graph,
            settings,
        }
    }

    /// Run the warm sequence on a detached background thread.
    pub fn spawn(self) {
        std::thread::Builder::new()
            .name("cache-warmer".to_string())
            .spawn(move || self.auto_warm_sequence())
            .ok();
    }

    /// Background warming strategy: entry points first, then a short settle
    /// delay for discoveries to accumulate, then discovered imports.
    pub fn auto_warm_sequence(&self) {
        // Give the request handler a head start
        std::thread::sleep(Duration::from_millis(100));

        self.warm_entry_points();

        std::thread::sleep(Duration::from_millis(500));

        self.preload_discovered(self.settings.warmer.discovery_preload_limit);
    }

    /// Find likely roots of the dependency graph: conventional names in the
    /// project root, plus a bounded scan for `__main__` guards.
    pub fn discover_entry_points(&self) -> Vec<String> {
        let mut candidates: Vec<String> = Vec::new();

        for name in ENTRY_POINT_NAMES {
            let path = self.project_root.join(name);
            if path.exists() {
                if let Ok(canonical) = path.canonicalize() {
                    push_unique(&mut candidates, canonical.to_string_lossy().to_string());
                }
            }
        }

        let mut scanned = 0usize;
        let scan_limit = self.settings.warmer.entry_point_scan_limit;
        let walker = WalkDir::new(&self.project_root)
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_skipped(entry.path()));

        for entry in walker.filter_map(Result::ok) {
            if scanned >= scan_limit || candidates.len() >= MAX_CANDIDATES {
                break;
            }
            let path = entry.path();
            if !entry.file_type().is_file()
                || path.extension().and_then(|e| e.to_str()) != Some("py")
            {
                continue;
            }

            if let Ok(content) = std::fs::read_to_string(path) {
                if content.contains("__name__ == \"__main__\"")
                    || content.contains("__name__ == '__main__'")
                {
                    if let Ok(canonical) = path.canonicalize() {
                        push_unique(&mut candidates, canonical.to_string_lossy().to_string());
                    }
                }
                scanned += 1;
            }
        }

        candidates.truncate(MAX_CANDIDATES);
        candidates
    }

    pub fn warm_entry_points(&self) {
        let entry_points = self.discover_entry_points();
        if entry_points.is_empty() {
            return;
        }

        tracing::info!("Warming cache for {} entry points", entry_points.len());
        self.warm(&entry_points);
    }

    /// Parse discovered-but-unindexed files, up to `limit`.
    pub fn preload_discovered(&self, limit: usize) {
        let discovered: Vec<String> = {
            let graph = self.graph.read();
            graph.discovered_files().into_iter().take(limit).collect()
        };

        if !discovered.is_empty() {
            tracing::info!("Preloading {} discovered imports", discovered.len());
            self.warm(&discovered);
        }
    }

    /// Warm files at skeleton level through the graph's public entry point.
    pub fn warm(&self, paths: &[String]) {
        for path in paths {
            let result = self.graph.write().get_file(
                Path::new(path),
                FetchLevel::Skeleton,
                OutputFormat::Standard,
                None,
            );
            if let Err(e) = result {
                tracing::warn!("Failed to warm {path}: {e}");
            }
        }
    }
}

fn push_unique(candidates: &mut Vec<String>, path: String) {
    if !candidates.contains(&path) {
        candidates.push(path);
    }
}

fn is_skipped(path: &Path) -> bool {
    match path.file_name().and_then(|n| n.to_str()) {
        Some(name) => name.starts_with('.') || SKIP_DIRS.contains(&name),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn warmer_for(dir: &TempDir) -> CacheWarmer {
        let root = dir.path().canonicalize().unwrap();
        let graph = Arc::new(RwLock::new(LazyGraph::new(&root).unwrap()));
        CacheWarmer::new(root, graph, Arc::new(Settings::default()))
    }

    #[test]
    fn test_conventional_names_found_first() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("main.py"), "print('hi')\n").unwrap();
        std::fs::write(dir.path().join("lib.py"), "def f():\n    pass\n").unwrap();

        let warmer = warmer_for(&dir);
        let candidates = warmer.discover_entry_points();
        assert_eq!(candidates.len(), 1);
        assert!(candidates[0].ends_with("main.py"));
    }

    #[test]
    fn test_main_guard_scan() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("tool.py"),
            "def run():\n    pass\n\nif __name__ == \"__main__\":\n    run()\n",
        )
        .unwrap();

        let warmer = warmer_for(&dir);
        let candidates = warmer.discover_entry_points();
        assert_eq!(candidates.len(), 1);
        assert!(candidates[0].ends_with("tool.py"));
    }

    #[test]
    fn test_skips_vendored_dirs() {
        let dir = TempDir::new().unwrap();
        let vendored = dir.path().join("venv");
        std::fs::create_dir_all(&vendored).unwrap();
        std::fs::write(
            vendored.join("main.py"),
            "if __name__ == \"__main__\":\n    pass\n",
        )
        .unwrap();

        let warmer = warmer_for(&dir);
        assert!(warmer.discover_entry_points().is_empty());
    }

    #[test]
    fn test_candidate_cap() {
        let dir = TempDir::new().unwrap();
        for name in ["main.py", "app.py", "run.py", "server.py", "cli.py", "manage.py"] {
            std::fs::write(dir.path().join(name), "x = 1\n").unwrap();
        }

        let warmer = warmer_for(&dir);
        assert_eq!(warmer.discover_entry_points().len(), MAX_CANDIDATES);
    }

    #[test]
    fn test_warm_populates_graph_and_tolerates_errors() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("main.py"), "def go():\n    pass\n").unwrap();
        let root = dir.path().canonicalize().unwrap();
        let graph = Arc::new(RwLock::new(LazyGraph::new(&root).unwrap()));
        let warmer = CacheWarmer::new(root.clone(), graph.clone(), Arc::new(Settings::default()));

        let main = root.join("main.py").to_string_lossy().to_string();
        let ghost = root.join("ghost.py").to_string_lossy().to_string();
        warmer.warm(&[main.clone(), ghost]);

        assert!(graph.read().is_loaded(Path::new(&main)));
        assert_eq!(graph.read().raw_stats().parses, 1);
    }
}
