use rmcp::{
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult,
        PaginatedRequestParam, ProtocolVersion, ServerCapabilities, ServerInfo, Tool,
    },
    service::RequestContext,
    Error as McpError, RoleServer, ServerHandler,
};
use std::sync::Arc;

use crate::mallory::client::{IntelligenceApi, MalloryClient};
use crate::settings::Settings;
use crate::tools::context::ToolContext;
use crate::tools::register_all_tools;
use crate::tools::registry::{InvocationRequest, ToolError, ToolRegistry};

/// MCP front end: advertises the registered tools and routes `tools/call`
/// through the registry.
#[derive(Clone)]
pub struct MalloryToolsServer {
    registry: Arc<ToolRegistry>,
    context: ToolContext,
}

impl MalloryToolsServer {
    pub fn new(client: Arc<dyn IntelligenceApi>) -> Result<Self, ToolError> {
        let mut registry = ToolRegistry::new();
        register_all_tools(&mut registry)?;
        tracing::info!(tools = registry.len(), "Tools loaded successfully");

        Ok(Self {
            registry: Arc::new(registry),
            context: ToolContext::new(client),
        })
    }

    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        if settings.mallory_api_key.is_empty() {
            tracing::warn!("MALLORY_API_KEY is not set; every upstream call will be rejected");
        }

        tracing::debug!(
            api_url = %settings.mallory_api_url,
            app_env = %settings.app_env,
            "Creating Mallory client"
        );
        let client =
            MalloryClient::new(&settings.mallory_api_url, settings.mallory_api_key.clone())?;

        Ok(Self::new(Arc::new(client))?)
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn tools(&self) -> Vec<Tool> {
        self.registry
            .descriptors()
            .map(|descriptor| {
                Tool::new(
                    descriptor.name.clone(),
                    descriptor.description.clone(),
                    Arc::new(descriptor.input_schema.clone()),
                )
            })
            .collect()
    }

    /// Runs one `tools/call`. Upstream failures come back as an error result
    /// carrying the envelope; registry failures become JSON-RPC errors.
    pub async fn dispatch(
        &self,
        request: CallToolRequestParam,
    ) -> Result<CallToolResult, McpError> {
        let invocation =
            InvocationRequest::new(request.name.to_string(), request.arguments.unwrap_or_default());
        tracing::info!(tool = %invocation.tool_name, "Handling tool call");

        match self.registry.invoke(&self.context, invocation).await {
            Ok(output) => Ok(output.into_call_result()),
            Err(e) => {
                tracing::error!("Rejected tool call: {}", e);
                Err(McpError::invalid_params(e.to_string(), None))
            }
        }
    }

    fn instructions(&self) -> String {
        let mut text = String::from(
            "This server provides tools to query the Mallory threat intelligence platform \
             for threat actors and vulnerabilities.\nAvailable tools:\n",
        );
        for descriptor in self.registry.descriptors() {
            text.push_str(&format!("- '{}': {}\n", descriptor.name, descriptor.description));
        }
        text
    }
}

impl ServerHandler for MalloryToolsServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(self.instructions()),
        }
    }

    async fn list_tools(
        &self,
        _request: PaginatedRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult {
            next_cursor: None,
            tools: self.tools(),
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        self.dispatch(request).await
    }
}
