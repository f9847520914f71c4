//! End-to-end read flows through the tool dispatcher.

use std::sync::Arc;

use serde_json::json;
use tempfile::TempDir;

use auzoom::config::Settings;
use auzoom::mcp::ToolDispatcher;

fn dispatcher_with(dir: &TempDir, threshold: usize) -> ToolDispatcher {
    let settings = Settings {
        small_file_threshold: threshold,
        auto_warm: false,
        ..Settings::default()
    };
    ToolDispatcher::new(dir.path(), Arc::new(settings)).unwrap()
}

fn write(dir: &TempDir, name: &str, content: &str) -> String {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path.canonicalize().unwrap().to_string_lossy().to_string()
}

#[test]
fn skeleton_read_reports_local_dependents() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "f.py", "def a():\n    b()\n\ndef b():\n    pass\n");
    let dispatcher = dispatcher_with(&dir, 0);

    let result = dispatcher.read(&json!({"path": "f.py", "level": "skeleton"}));
    assert_eq!(result["type"], "python");
    assert_eq!(result["imports"].as_array().unwrap().len(), 0);

    let nodes = result["nodes"].as_array().unwrap();
    assert_eq!(nodes.len(), 2);
    let ids: Vec<&str> = nodes.iter().map(|n| n["id"].as_str().unwrap()).collect();
    assert!(ids.contains(&format!("{path}::a").as_str()));
    assert!(ids.contains(&format!("{path}::b").as_str()));

    let b = nodes.iter().find(|n| n["name"] == "b").unwrap();
    assert_eq!(b["dependents"], json!([format!("{path}::a")]));
}

#[test]
fn stats_track_hits_and_single_parse() {
    let dir = TempDir::new().unwrap();
    write(&dir, "f.py", "def a():\n    b()\n\ndef b():\n    pass\n");
    let dispatcher = dispatcher_with(&dir, 0);

    for _ in 0..3 {
        let result = dispatcher.read(&json!({"path": "f.py"}));
        assert_eq!(result["type"], "python");
    }

    let stats = dispatcher.stats();
    assert_eq!(stats["cache_hits"], 2);
    assert_eq!(stats["cache_misses"], 1);
    assert_eq!(stats["files_parsed"], 1);
    assert_eq!(stats["hit_rate"], "66.7%");
}

#[test]
fn class_children_resolve_to_method_nodes() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "c.py", "class C:\n    def m(self):\n        pass\n");
    let dispatcher = dispatcher_with(&dir, 0);

    let result = dispatcher.read(&json!({"path": "c.py", "level": "full"}));
    let nodes = result["nodes"].as_array().unwrap();
    assert_eq!(nodes.len(), 2);

    let class = nodes.iter().find(|n| n["type"] == "class").unwrap();
    assert_eq!(class["children"], json!([format!("{path}::C.m")]));

    let method = nodes.iter().find(|n| n["type"] == "method").unwrap();
    assert_eq!(method["id"], format!("{path}::C.m"));

    // The child id resolves through the dependency tool as well
    let deps = dispatcher.get_dependencies(&json!({"node_id": format!("{path}::C.m")}));
    assert_eq!(deps["count"], 1);
}

#[test]
fn small_file_bypass_returns_content_without_parse() {
    let dir = TempDir::new().unwrap();
    let body: String = (0..80).map(|i| format!("x{i} = {i}\n")).collect();
    write(&dir, "small.py", &body);
    let dispatcher = dispatcher_with(&dir, 500);

    let result = dispatcher.read(&json!({"path": "small.py", "level": "skeleton"}));
    assert_eq!(result["type"], "small_file_bypass");
    assert_eq!(result["level"], "full");
    assert_eq!(result["content"].as_str().unwrap(), body);

    let stats = dispatcher.stats();
    assert_eq!(stats["files_parsed"], 0);
    assert_eq!(stats["cache_misses"], 0);
}

#[test]
fn imports_discovered_but_not_parsed() {
    let dir = TempDir::new().unwrap();
    write(&dir, "b.py", "def helper():\n    pass\n");
    write(&dir, "a.py", "import b\n\ndef run():\n    helper()\n");
    let dispatcher = dispatcher_with(&dir, 0);

    let result = dispatcher.read(&json!({"path": "a.py"}));
    assert_eq!(result["imports"], json!(["b"]));

    let stats = dispatcher.stats();
    assert_eq!(stats["files_parsed"], 1);
    assert_eq!(stats["files_discovered"], 1);
    assert_eq!(stats["files_indexed"], 1);
}

#[test]
fn changed_file_is_reparsed_with_fresh_ids() {
    let dir = TempDir::new().unwrap();
    write(&dir, "a.py", "def before():\n    pass\n");
    let dispatcher = dispatcher_with(&dir, 0);

    dispatcher.read(&json!({"path": "a.py"}));
    write(&dir, "a.py", "def after():\n    pass\n");

    let result = dispatcher.read(&json!({"path": "a.py"}));
    let nodes = result["nodes"].as_array().unwrap();
    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0]["name"], "after");

    let stats = dispatcher.stats();
    assert_eq!(stats["cache_misses"], 2);
    assert_eq!(stats["files_parsed"], 2);

    // The removed function is no longer findable
    let found = dispatcher.find(&json!({"pattern": "before"}));
    assert_eq!(found["count"], 0);
}

#[test]
fn parse_levels_are_monotonic_supersets() {
    let dir = TempDir::new().unwrap();
    write(
        &dir,
        "m.py",
        "def documented(x):\n    \"\"\"Doc text.\"\"\"\n    return x\n",
    );
    let dispatcher = dispatcher_with(&dir, 0);

    let skeleton = dispatcher.read(&json!({"path": "m.py", "level": "skeleton"}));
    let summary = dispatcher.read(&json!({"path": "m.py", "level": "summary"}));
    let full = dispatcher.read(&json!({"path": "m.py", "level": "full"}));

    let skeleton_keys = skeleton["nodes"][0].as_object().unwrap();
    let summary_keys = summary["nodes"][0].as_object().unwrap();
    let full_keys = full["nodes"][0].as_object().unwrap();

    for key in skeleton_keys.keys() {
        assert!(summary_keys.contains_key(key));
    }
    for key in summary_keys.keys() {
        assert!(full_keys.contains_key(key));
    }
}

#[test]
fn import_nodes_never_appear_in_nodes_field() {
    let dir = TempDir::new().unwrap();
    write(&dir, "m.py", "import os\nimport sys\n\ndef f():\n    pass\n");
    let dispatcher = dispatcher_with(&dir, 0);

    let result = dispatcher.read(&json!({"path": "m.py", "level": "full"}));
    assert_eq!(result["import_count"], 2);
    assert_eq!(result["node_count"], 1);
    for node in result["nodes"].as_array().unwrap() {
        assert_ne!(node["type"], "import");
    }
}

#[test]
fn empty_and_import_only_files() {
    let dir = TempDir::new().unwrap();
    write(&dir, "empty.py", "");
    write(&dir, "imports_only.py", "import os\n");
    let dispatcher = dispatcher_with(&dir, 0);

    let result = dispatcher.read(&json!({"path": "empty.py"}));
    assert_eq!(result["node_count"], 0);
    assert_eq!(result["import_count"], 0);
    assert!(result.get("error").is_none());

    let result = dispatcher.read(&json!({"path": "imports_only.py"}));
    assert_eq!(result["node_count"], 0);
    assert_eq!(result["imports"], json!(["os"]));
}

#[test]
fn unreadable_syntax_still_returns_structure_or_fallback() {
    // tree-sitter is error-tolerant; whichever path triggers, the agent
    // must get something actionable back
    let dir = TempDir::new().unwrap();
    write(&dir, "broken.py", "def broken(:\n    ???\n");
    let dispatcher = dispatcher_with(&dir, 0);

    let result = dispatcher.read(&json!({"path": "broken.py"}));
    let kind = result["type"].as_str().unwrap();
    assert!(kind == "python" || kind == "python_fallback");
    if kind == "python_fallback" {
        assert!(result["content"].as_str().unwrap().contains("broken"));
    }
}
