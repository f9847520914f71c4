//! Cache warming against a real project layout.

use std::sync::Arc;

use parking_lot::RwLock;
use tempfile::TempDir;

use auzoom::cache::CacheWarmer;
use auzoom::config::Settings;
use auzoom::graph::LazyGraph;

fn project() -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("main.py"),
        "import helper\n\ndef run():\n    pass\n\nif __name__ == \"__main__\":\n    run()\n",
    )
    .unwrap();
    std::fs::write(dir.path().join("helper.py"), "def assist():\n    pass\n").unwrap();
    dir
}

fn warmer(dir: &TempDir) -> (Arc<RwLock<LazyGraph>>, CacheWarmer) {
    let root = dir.path().canonicalize().unwrap();
    let graph = Arc::new(RwLock::new(LazyGraph::new(&root).unwrap()));
    let warmer = CacheWarmer::new(root, graph.clone(), Arc::new(Settings::default()));
    (graph, warmer)
}

#[test]
fn entry_points_warm_and_discover_imports() {
    let dir = project();
    let (graph, warmer) = warmer(&dir);

    warmer.warm_entry_points();

    let stats = graph.read().raw_stats();
    assert_eq!(stats.parses, 1); // main.py only

    let discovered = graph.read().discovered_files();
    assert_eq!(discovered.len(), 1);
    assert!(discovered[0].ends_with("helper.py"));
}

#[test]
fn preload_indexes_discovered_files() {
    let dir = project();
    let (graph, warmer) = warmer(&dir);

    warmer.warm_entry_points();
    warmer.preload_discovered(10);

    assert_eq!(graph.read().raw_stats().parses, 2);
    assert!(graph.read().discovered_files().is_empty());
}

#[test]
fn preload_respects_limit() {
    let dir = TempDir::new().unwrap();
    let mut imports = String::new();
    for i in 0..4 {
        std::fs::write(
            dir.path().join(format!("dep{i}.py")),
            "def f():\n    pass\n",
        )
        .unwrap();
        imports.push_str(&format!("import dep{i}\n"));
    }
    std::fs::write(
        dir.path().join("main.py"),
        format!("{imports}\ndef go():\n    pass\n"),
    )
    .unwrap();

    let (graph, warmer) = warmer(&dir);
    warmer.warm_entry_points();
    warmer.preload_discovered(2);

    assert_eq!(graph.read().raw_stats().parses, 3); // main + 2 preloads
    assert_eq!(graph.read().discovered_files().len(), 2);
}

#[test]
fn warming_errors_do_not_propagate() {
    let dir = project();
    let (graph, warmer) = warmer(&dir);

    let ghost = dir.path().join("ghost.py").to_string_lossy().to_string();
    warmer.warm(&[ghost]);

    // Graph untouched and still usable
    assert_eq!(graph.read().raw_stats().parses, 0);
    warmer.warm_entry_points();
    assert_eq!(graph.read().raw_stats().parses, 1);
}
