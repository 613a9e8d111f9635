//! MCP server handler exposing the environment-management tools.
//!
//! This is a thin pass-through over [`EnvironmentManager`]: it validates
//! protocol initialization, lists the three environment tools, and translates
//! core failures into RPC errors whose messages carry the actionable detail
//! (e.g. the available-names list on an unknown switch target).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use rust_mcp_sdk::schema::{
    CallToolResult, ClientRequest, ListToolsResult, RpcError, TextContent, Tool, ToolInputSchema,
    schema_utils::{NotificationFromClient, RequestFromClient, ResultFromServer},
};
use rust_mcp_sdk::{
    McpServer,
    mcp_server::{ServerHandlerCore, enforce_compatible_protocol_version},
};
use serde_json::{Map as JsonMap, Value as JsonValue};

use crate::error::ConfigError;
use crate::manager::EnvironmentManager;

pub const TOOL_SWITCH_ENVIRONMENT: &str = "switch_environment";
pub const TOOL_CURRENT_ENVIRONMENT: &str = "current_environment";
pub const TOOL_LIST_ENVIRONMENTS: &str = "list_environments";

/// Routes MCP requests to the shared environment manager.
pub struct EnvironmentServerHandler {
    manager: Arc<EnvironmentManager>,
}

impl EnvironmentServerHandler {
    pub fn new(manager: Arc<EnvironmentManager>) -> Self {
        Self { manager }
    }

    /// Build the tool definitions exposed by this server.
    pub fn tool_definitions(&self) -> Vec<Tool> {
        let mut name_schema = JsonMap::new();
        name_schema.insert("type".to_string(), JsonValue::String("string".to_string()));
        name_schema.insert(
            "description".to_string(),
            JsonValue::String("Name of the environment to switch to".to_string()),
        );
        let mut switch_props = HashMap::new();
        switch_props.insert("name".to_string(), name_schema);

        vec![
            tool(
                TOOL_SWITCH_ENVIRONMENT,
                "Switch the active warehouse environment by name.",
                ToolInputSchema::new(vec!["name".to_string()], Some(switch_props)),
            ),
            tool(
                TOOL_CURRENT_ENVIRONMENT,
                "Describe the currently active warehouse environment.",
                ToolInputSchema::new(Vec::new(), None),
            ),
            tool(
                TOOL_LIST_ENVIRONMENTS,
                "List all configured warehouse environments.",
                ToolInputSchema::new(Vec::new(), None),
            ),
        ]
    }

    fn render_listing(&self) -> Result<String, ConfigError> {
        let all = self.manager.list_all()?;
        let active = self.manager.active_name();
        let mut out = format!("Configured environments ({}):\n", all.len());
        for (name, env) in &all {
            let marker = if active.as_deref() == Some(name) {
                " (active)"
            } else {
                ""
            };
            out.push_str(&format!(
                "- {}{}: host={}, auth={}, http_path={}",
                name,
                marker,
                env.host(),
                env.auth().kind(),
                env.http_path()
            ));
            if let Some(desc) = env.description() {
                out.push_str(&format!(", description={desc}"));
            }
            if !env.tags().is_empty() {
                out.push_str(&format!(", tags={}", env.tags().join(", ")));
            }
            out.push('\n');
        }
        Ok(out)
    }
}

fn tool(name: &str, description: &str, input_schema: ToolInputSchema) -> Tool {
    Tool {
        annotations: None,
        description: Some(description.to_string()),
        input_schema,
        meta: None,
        name: name.to_string(),
        output_schema: None,
        title: None,
    }
}

fn text_result(text: String) -> ResultFromServer {
    CallToolResult::text_content(vec![TextContent::from(text)]).into()
}

/// Translate a core failure into an RPC error, keeping the core's message
/// so callers can self-correct.
fn rpc_error(err: ConfigError) -> RpcError {
    match err {
        ConfigError::UnknownEnvironment { .. } => {
            RpcError::invalid_params().with_message(err.to_string())
        }
        other => RpcError::internal_error().with_message(other.to_string()),
    }
}

#[async_trait]
impl ServerHandlerCore for EnvironmentServerHandler {
    async fn handle_request(
        &self,
        request: RequestFromClient,
        runtime: &dyn McpServer,
    ) -> std::result::Result<ResultFromServer, RpcError> {
        let method_name = request.method().to_owned();
        tracing::debug!("handle_request: method={}", method_name);
        match request {
            RequestFromClient::ClientRequest(client_request) => match client_request {
                ClientRequest::InitializeRequest(initialize_request) => {
                    let mut server_info = runtime.server_info().to_owned();
                    if let Some(updated_protocol_version) = enforce_compatible_protocol_version(
                        &initialize_request.params.protocol_version,
                        &server_info.protocol_version,
                    )
                    .map_err(|err| {
                        tracing::error!(
                            "incompatible protocol version (client={}, server={})",
                            initialize_request.params.protocol_version,
                            server_info.protocol_version
                        );
                        RpcError::internal_error().with_message(err.to_string())
                    })? {
                        server_info.protocol_version = updated_protocol_version;
                    }
                    tracing::info!("initialized (protocol={})", server_info.protocol_version);
                    Ok(server_info.into())
                }

                ClientRequest::ListToolsRequest(_) => {
                    let tools = self.tool_definitions();
                    tracing::info!("list_tools (count={})", tools.len());
                    Ok(ListToolsResult {
                        meta: None,
                        next_cursor: None,
                        tools,
                    }
                    .into())
                }

                ClientRequest::CallToolRequest(request) => {
                    let tool = request.tool_name().to_string();
                    tracing::info!("call_tool request: tool={}", tool);
                    match tool.as_str() {
                        TOOL_SWITCH_ENVIRONMENT => {
                            let name = request
                                .params
                                .arguments
                                .as_ref()
                                .and_then(|m| m.get("name"))
                                .and_then(|v| v.as_str())
                                .ok_or_else(|| {
                                    tracing::error!(
                                        "missing required 'name' in arguments (tool={})",
                                        tool
                                    );
                                    RpcError::invalid_params()
                                        .with_message("missing required 'name' string".to_string())
                                })?;
                            match self.manager.switch_to(name) {
                                Ok(confirmation) => Ok(text_result(confirmation)),
                                Err(e) => {
                                    tracing::warn!("switch_environment failed: {}", e);
                                    Err(rpc_error(e))
                                }
                            }
                        }
                        TOOL_CURRENT_ENVIRONMENT => match self.manager.active_summary() {
                            Ok(summary) => Ok(text_result(summary)),
                            Err(e) => {
                                tracing::warn!("current_environment failed: {}", e);
                                Err(rpc_error(e))
                            }
                        },
                        TOOL_LIST_ENVIRONMENTS => match self.render_listing() {
                            Ok(listing) => Ok(text_result(listing)),
                            Err(e) => {
                                tracing::warn!("list_environments failed: {}", e);
                                Err(rpc_error(e))
                            }
                        },
                        _ => {
                            tracing::warn!("unknown tool: {}", tool);
                            Err(RpcError::method_not_found()
                                .with_message(format!("Unknown tool '{}'", tool)))
                        }
                    }
                }

                _ => {
                    tracing::warn!("method not implemented: {}", method_name);
                    Err(RpcError::method_not_found()
                        .with_message(format!("No handler is implemented for '{method_name}'.")))
                }
            },
            RequestFromClient::CustomRequest(_) => {
                tracing::warn!("custom request not implemented");
                Err(RpcError::method_not_found()
                    .with_message("No handler is implemented for custom requests.".to_string()))
            }
        }
    }

    async fn handle_notification(
        &self,
        notification: NotificationFromClient,
        _: &dyn McpServer,
    ) -> std::result::Result<(), RpcError> {
        match &notification {
            NotificationFromClient::ClientNotification(_) => {
                tracing::debug!("handle_notification: client notification")
            }
            NotificationFromClient::CustomNotification(_) => {
                tracing::debug!("handle_notification: custom notification")
            }
        }
        Ok(())
    }

    async fn handle_error(
        &self,
        error: &RpcError,
        _: &dyn McpServer,
    ) -> std::result::Result<(), RpcError> {
        tracing::error!(
            "handle_error from client (code={:?}, message={:?})",
            error.code,
            error.message
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn handler_with_config() -> (tempfile::TempDir, EnvironmentServerHandler) {
        let dir = tempfile::tempdir().unwrap();
        let yaml = dir.path().join("environments.yaml");
        let mut f = std::fs::File::create(&yaml).unwrap();
        f.write_all(
            b"default: dev\nenvironments:\n  dev:\n    host: dev.cloud.example.com\n    profile: dev-profile\n    http_path: /sql/1.0/warehouses/abc123\n    tags: [development]\n  prod:\n    host: prod.cloud.example.com\n    token: dapi0123456789\n    http_path: /sql/1.0/warehouses/def456\n",
        )
        .unwrap();
        let manager = Arc::new(EnvironmentManager::new(yaml, dir.path().join(".env")));
        manager.load().expect("load");
        manager.activate_default().expect("activate");
        (dir, EnvironmentServerHandler::new(manager))
    }

    #[test]
    fn tool_definitions_expose_three_tools() {
        let (_dir, handler) = handler_with_config();
        let tools = handler.tool_definitions();
        let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                TOOL_SWITCH_ENVIRONMENT,
                TOOL_CURRENT_ENVIRONMENT,
                TOOL_LIST_ENVIRONMENTS
            ]
        );

        let switch = serde_json::to_value(&tools[0]).expect("serialize tool");
        let required = switch
            .get("inputSchema")
            .and_then(|s| s.get("required"))
            .and_then(|r| r.as_array())
            .cloned()
            .unwrap_or_default();
        assert!(required.iter().any(|v| v.as_str() == Some("name")));
    }

    #[test]
    fn listing_marks_active_environment() {
        let (_dir, handler) = handler_with_config();
        let listing = handler.render_listing().expect("listing");
        assert!(listing.contains("- dev (active): host=dev.cloud.example.com, auth=profile"));
        assert!(listing.contains("- prod: host=prod.cloud.example.com, auth=token"));
        assert!(!listing.contains("dapi0123456789"));
    }

    #[test]
    fn unknown_environment_maps_to_invalid_params() {
        let err = rpc_error(ConfigError::UnknownEnvironment {
            name: "staging".to_string(),
            available: vec!["dev".to_string(), "prod".to_string()],
        });
        let msg = err.message;
        assert!(msg.contains("staging"));
        assert!(msg.contains("dev, prod"));
    }
}
