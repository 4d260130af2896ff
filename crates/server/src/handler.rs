//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use crate::state::AppState;
use crate::tools::{CatalogSearchParams, EntityParams, StatisticsParams, entity, search, statistics};

use holonet_core::ResourceKind;
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The main MCP server handler for holonet.
#[derive(Clone)]
pub struct HolonetServer {
    tool_router: ToolRouter<Self>,
    state: AppState,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// Each tool receives the request context; its cancellation token aborts
/// upstream calls when the client cancels.
#[tool_router]
impl HolonetServer {
    pub fn new(state: AppState) -> Self {
        Self { tool_router: Self::tool_router(), state }
    }

    #[tool(
        description = "Search the Star Wars catalog for people (by name) or films (by title). Returns the upstream results with ids and the response time in ms."
    )]
    async fn catalog_search(
        &self, params: Parameters<CatalogSearchParams>, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        search::search_impl(&self.state, params.0, &context.ct).await
    }

    #[tool(description = "Get a person by id, with their films expanded to {id, url, title} summaries.")]
    async fn person_get(
        &self, params: Parameters<EntityParams>, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        entity::get_impl(&self.state, ResourceKind::Person, params.0, &context.ct).await
    }

    #[tool(description = "Get a film by id, with its characters expanded to {id, url, name} summaries.")]
    async fn film_get(
        &self, params: Parameters<EntityParams>, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        entity::get_impl(&self.state, ResourceKind::Film, params.0, &context.ct).await
    }

    #[tool(description = "Usage statistics over logged searches: top queries, average response time, popular hours, type distribution and totals.")]
    async fn statistics_get(&self, params: Parameters<StatisticsParams>) -> Result<CallToolResult, McpError> {
        statistics::statistics_impl(&self.state, params.0).await
    }
}

impl ServerHandler for HolonetServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "holonet".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
