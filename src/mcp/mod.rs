//! MCP (Model Context Protocol) surface for the navigation service.
//!
//! One client at a time, line-delimited JSON-RPC 2.0 over stdio. The
//! dispatcher carries the tool semantics; the server module adapts them to
//! the protocol. The same dispatcher also backs the embedded one-shot CLI
//! mode, so tool behavior cannot drift between the two paths.

pub mod dispatcher;
pub mod server;
pub mod summarizer;

pub use dispatcher::ToolDispatcher;
pub use server::{NavigationServer, serve_stdio};
pub use summarizer::FileSummarizer;
