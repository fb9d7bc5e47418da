//! MCP server exposing the tool registry over `rmcp`.

use rmcp::model::{
    CallToolRequestParam, CallToolResult, Content, Implementation, ListToolsResult,
    PaginatedRequestParam, ServerCapabilities, ServerInfo, Tool,
};
use rmcp::service::RequestContext;
use rmcp::{ErrorData, RoleServer, ServerHandler};
use std::sync::Arc;
use tracing::debug;

use crate::client::Completion;
use crate::dispatch::{Dispatcher, ToolReply};
use crate::tools::{ToolSpec, TOOLS};

pub const SERVER_NAME: &str = "codex-mcp-server";

const INSTRUCTIONS: &str = "Code-intelligence tools backed by a Codex completion endpoint: \
generate code, review code, write tests, convert between languages and design architectures.";

/// MCP handler that forwards tool calls to a [`Dispatcher`].
pub struct CodexServer<C> {
    dispatcher: Arc<Dispatcher<C>>,
}

impl<C> Clone for CodexServer<C> {
    fn clone(&self) -> Self {
        Self {
            dispatcher: Arc::clone(&self.dispatcher),
        }
    }
}

impl<C: Completion> CodexServer<C> {
    pub fn new(dispatcher: Dispatcher<C>) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
        }
    }
}

impl From<&ToolSpec> for Tool {
    fn from(spec: &ToolSpec) -> Self {
        Tool::new(spec.name, spec.description, Arc::new(spec.input_schema()))
    }
}

impl From<ToolReply> for CallToolResult {
    fn from(reply: ToolReply) -> Self {
        let content = vec![Content::text(reply.text)];
        if reply.is_error {
            CallToolResult::error(content)
        } else {
            CallToolResult::success(content)
        }
    }
}

/// Tool descriptors advertised to clients.
pub fn tool_list() -> Vec<Tool> {
    TOOLS.iter().map(Tool::from).collect()
}

impl<C: Completion + 'static> ServerHandler for CodexServer<C> {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: SERVER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Implementation::from_build_env()
            },
            instructions: Some(INSTRUCTIONS.to_string()),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, ErrorData> {
        Ok(ListToolsResult::with_all_items(tool_list()))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        debug!("call_tool {}", request.name);
        let args = request.arguments.unwrap_or_default();
        let reply = self.dispatcher.dispatch(&request.name, &args).await;
        Ok(reply.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::OutputKind;

    #[test]
    fn test_tool_list_matches_registry() {
        let tools = tool_list();
        let names: Vec<&str> = tools.iter().map(|t| &*t.name).collect();
        assert_eq!(
            names,
            vec!["codex_generate", "codex_review", "codex_test", "codex_convert", "codex_architect"]
        );
        assert_eq!(tools[0].input_schema["required"], serde_json::json!(["prompt"]));
    }

    #[test]
    fn test_reply_maps_error_flag() {
        let ok: CallToolResult = ToolReply {
            text: "done".to_string(),
            is_error: false,
            kind: OutputKind::Structured,
        }
        .into();
        assert_eq!(ok.is_error, Some(false));

        let failed: CallToolResult = ToolReply {
            text: "Error: Unknown tool: x".to_string(),
            is_error: true,
            kind: OutputKind::Failed,
        }
        .into();
        assert_eq!(failed.is_error, Some(true));
    }
}
