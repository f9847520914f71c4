pub mod cache;
pub mod config;
pub mod error;
pub mod graph;
pub mod logging;
pub mod mcp;
pub mod node;
pub mod parsing;
pub mod types;

pub use cache::{CacheRecord, CacheWarmer, FileIndexEntry, MetadataStore};
pub use config::Settings;
pub use error::{GraphError, GraphResult};
pub use graph::{ImportResolver, LazyGraph, TraversalEngine, TraversalOptions};
pub use mcp::{NavigationServer, ToolDispatcher};
pub use node::CodeNode;
pub use parsing::PythonParser;
pub use types::{FetchLevel, NodeKind, OutputFormat, TraversalDirection, TraversalStrategy};
