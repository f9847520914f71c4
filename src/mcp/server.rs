//! MCP server exposing the navigation tools over stdio.
//!
//! Thin shell around [`ToolDispatcher`]: every tool renders the dispatcher's
//! JSON payload as a single text content block. Errors inside tool semantics
//! stay in the payload (`{error, type?}`); transport-level failures become
//! JSON-RPC errors.

use std::sync::Arc;

use rmcp::{
    ServerHandler, ServiceExt,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{
        CallToolResult, Content, ErrorCode, ErrorData as McpError, Implementation,
        ProtocolVersion, ServerCapabilities, ServerInfo,
    },
    schemars, tool, tool_handler, tool_router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::mcp::dispatcher::ToolDispatcher;

#[derive(Debug, Deserialize, Serialize, schemars::JsonSchema)]
pub struct ReadRequest {
    /// File path to read, absolute or relative to the project root
    pub path: Option<String>,
    /// Detail level: "skeleton" (default), "summary", or "full"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    /// Output format: "standard" (default) or "compact"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Restrict node output to exactly these field names
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<String>>,
    /// Line offset for partial reads of non-Python files
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
    /// Line limit for partial reads of non-Python files
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
}

#[derive(Debug, Deserialize, Serialize, schemars::JsonSchema)]
pub struct FindRequest {
    /// Name pattern to search for (case-insensitive substring)
    pub pattern: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, schemars::JsonSchema)]
pub struct GetDependenciesRequest {
    /// Node id to analyze, e.g. "/path/to/file.py::func"
    pub node_id: Option<String>,
    /// Maximum traversal depth (default: 1)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth: Option<u64>,
    /// "bfs" (default, impact analysis) or "dfs" (chain analysis)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
    /// "reverse" (default, who calls this), "forward", or "both"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
    /// Node kinds to include, e.g. ["function", "method"]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_types: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Serialize, schemars::JsonSchema)]
pub struct GetCallsRequest {
    /// Node id to analyze
    pub node_id: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, schemars::JsonSchema)]
pub struct StatsRequest {}

#[derive(Clone)]
pub struct NavigationServer {
    dispatcher: Arc<ToolDispatcher>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl NavigationServer {
    pub fn new(dispatcher: Arc<ToolDispatcher>) -> Self {
        Self {
            dispatcher,
            tool_router: Self::tool_router(),
        }
    }

    fn reply(&self, payload: Value) -> Result<CallToolResult, McpError> {
        let text = serde_json::to_string_pretty(&payload).map_err(|e| {
            McpError::new(
                ErrorCode::INTERNAL_ERROR,
                format!("JSON serialization failed: {e}"),
                None,
            )
        })?;
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }

    #[tool(
        description = "Read a file with hierarchical navigation. Python files return parsed structure at the requested level (skeleton/summary/full); other files return a cached summary or full content. Files are indexed lazily on first access."
    )]
    pub async fn read(
        &self,
        Parameters(request): Parameters<ReadRequest>,
    ) -> Result<CallToolResult, McpError> {
        let args = serde_json::to_value(&request).unwrap_or_default();
        self.reply(self.dispatcher.read(&args))
    }

    #[tool(description = "Search for code by name pattern across loaded files.")]
    pub async fn find(
        &self,
        Parameters(request): Parameters<FindRequest>,
    ) -> Result<CallToolResult, McpError> {
        let args = serde_json::to_value(&request).unwrap_or_default();
        self.reply(self.dispatcher.find(&args))
    }

    #[tool(
        description = "Get the dependency graph for a node. Defaults to BFS over reverse edges (who calls this), the impact-analysis case. Supports dfs, forward/both directions, depth, and node type filters."
    )]
    pub async fn get_dependencies(
        &self,
        Parameters(request): Parameters<GetDependenciesRequest>,
    ) -> Result<CallToolResult, McpError> {
        let args = serde_json::to_value(&request).unwrap_or_default();
        self.reply(self.dispatcher.get_dependencies(&args))
    }

    #[tool(
        description = "Get the functions a node calls (forward dependencies), computed on demand by reparsing the node's source. ~150 tokens and no caching - use sparingly."
    )]
    pub async fn get_calls(
        &self,
        Parameters(request): Parameters<GetCallsRequest>,
    ) -> Result<CallToolResult, McpError> {
        let args = serde_json::to_value(&request).unwrap_or_default();
        self.reply(self.dispatcher.get_calls(&args))
    }

    #[tool(description = "Get cache performance statistics.")]
    pub async fn stats(
        &self,
        Parameters(_request): Parameters<StatsRequest>,
    ) -> Result<CallToolResult, McpError> {
        self.reply(self.dispatcher.stats())
    }
}

#[tool_handler]
impl ServerHandler for NavigationServer {
    fn get_info(&self) -> ServerInfo {
        let mut info = ServerInfo::default();
        info.protocol_version = ProtocolVersion::V_2024_11_05;
        info.capabilities = ServerCapabilities::builder().enable_tools().build();
        info.server_info = Implementation::new("auzoom", env!("CARGO_PKG_VERSION"))
            .with_title("AuZoom Code Navigation");
        info.instructions = Some(
            "Multi-resolution code navigation. Start with 'read' at skeleton level to see a \
             file's structure cheaply; raise the level only for the nodes you care about. \
             Use 'get_dependencies' for impact analysis (who calls this), 'get_calls' for \
             forward call chains (computed on demand, use sparingly), 'find' to locate \
             symbols by name, and 'stats' to inspect cache behavior."
                .to_string(),
        );
        info
    }
}

/// Serve the tools over stdio until the client disconnects.
pub fn serve_stdio(dispatcher: ToolDispatcher) -> anyhow::Result<()> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?
        .block_on(async {
            let service = NavigationServer::new(Arc::new(dispatcher));
            let server = service.serve(rmcp::transport::stdio()).await?;
            server.waiting().await?;
            Ok(())
        })
}
