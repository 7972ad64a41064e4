//! MCP protocol implementation for JSON-RPC 2.0 communication.
//!
//! This module provides the core MCP server implementation including:
//! - JSON-RPC 2.0 request/response handling
//! - Tool definitions and schemas
//! - Line-delimited server communication over stdio or any async stream pair

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, error, info, warn};

use super::{handle_tool_call, SharedState};
use crate::diagram::DiagramSettings;
use crate::error::McpError;

#[cfg(test)]
#[path = "mcp_tests.rs"]
mod mcp_tests;

/// MCP protocol revision implemented by this server.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

const PARSE_ERROR: i32 = -32700;
const METHOD_NOT_FOUND: i32 = -32601;
const INVALID_PARAMS: i32 = -32602;
const INTERNAL_ERROR: i32 = -32603;

/// JSON-RPC 2.0 request structure.
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    /// JSON-RPC version (must be "2.0").
    pub jsonrpc: String,
    /// Request identifier (None for notifications).
    pub id: Option<Value>,
    /// The method name to invoke.
    pub method: String,
    /// Optional parameters for the method.
    #[serde(default)]
    pub params: Option<Value>,
}

/// JSON-RPC 2.0 response structure.
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    /// Always "2.0".
    pub jsonrpc: String,
    /// Request identifier, `null` when the request could not be read.
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// MCP server information returned during initialization.
#[derive(Debug, Serialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

/// MCP server capabilities advertised to clients.
#[derive(Debug, Serialize)]
pub struct Capabilities {
    pub tools: ToolCapabilities,
}

/// Tool-specific capabilities.
#[derive(Debug, Serialize)]
pub struct ToolCapabilities {
    #[serde(rename = "listChanged")]
    pub list_changed: bool,
}

/// Result of the MCP initialize handshake.
#[derive(Debug, Serialize)]
pub struct InitializeResult {
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    pub capabilities: Capabilities,
    #[serde(rename = "serverInfo")]
    pub server_info: ServerInfo,
}

/// MCP tool definition with JSON Schema.
#[derive(Debug, Clone, Serialize)]
pub struct Tool {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

impl Tool {
    fn new(name: &str, description: &str, input_schema: Value) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            input_schema,
        }
    }
}

/// Parameters for a tools/call request.
#[derive(Debug, Deserialize)]
pub struct ToolCallParams {
    pub name: String,
    #[serde(default)]
    pub arguments: Option<Value>,
}

/// Content item within a tool result.
#[derive(Debug, Serialize)]
pub struct ToolResultContent {
    #[serde(rename = "type")]
    pub content_type: String,
    pub text: String,
}

impl ToolResultContent {
    fn text(text: impl Into<String>) -> Self {
        Self {
            content_type: "text".to_string(),
            text: text.into(),
        }
    }
}

/// Result of a tool invocation.
#[derive(Debug, Serialize)]
pub struct ToolCallResult {
    pub content: Vec<ToolResultContent>,
    #[serde(rename = "isError", skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

impl JsonRpcResponse {
    /// Create a success response
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: id.unwrap_or(Value::Null),
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response
    pub fn error(id: Option<Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: id.unwrap_or(Value::Null),
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }
}

/// Body of an `isError` tool result.
///
/// Diagram failures carry their kind and whether an identical retry may
/// succeed so clients can decide without parsing the message.
pub fn tool_error_text(err: &McpError) -> String {
    match err {
        McpError::Diagram(diagram) => {
            let body = json!({
                "error": diagram.to_string(),
                "kind": diagram.kind(),
                "retryable": diagram.is_retryable(),
            });
            serde_json::to_string_pretty(&body).unwrap_or_else(|_| format!("Error: {}", diagram))
        }
        other => format!("Error: {}", other),
    }
}

/// MCP server speaking newline-delimited JSON-RPC.
pub struct McpServer {
    state: SharedState,
}

impl McpServer {
    /// Create a new MCP server
    pub fn new(state: SharedState) -> Self {
        Self { state }
    }

    /// Serve on the process's stdin and stdout until EOF.
    pub async fn run(&self) -> std::io::Result<()> {
        info!("MCP Argument Mapper starting...");
        let reader = BufReader::new(tokio::io::stdin());
        let writer = tokio::io::stdout();
        self.serve(reader, writer).await
    }

    /// Serve requests read line by line from `reader` until EOF.
    pub async fn serve<R, W>(&self, mut reader: R, mut writer: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut line = String::new();

        loop {
            line.clear();
            if reader.read_line(&mut line).await? == 0 {
                info!("EOF received, shutting down");
                break;
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            debug!(request = %trimmed, "Received request");

            let response = match serde_json::from_str::<JsonRpcRequest>(trimmed) {
                Ok(request) => self.handle_request(request).await,
                Err(e) => {
                    error!(error = %e, "Failed to parse request");
                    Some(JsonRpcResponse::error(
                        None,
                        PARSE_ERROR,
                        format!("Parse error: {}", e),
                    ))
                }
            };

            // Notifications get no response.
            if let Some(response) = response {
                let response_json = serde_json::to_string(&response)?;
                debug!(response = %response_json, "Sending response");

                writer.write_all(response_json.as_bytes()).await?;
                writer.write_all(b"\n").await?;
                writer.flush().await?;
            }
        }

        Ok(())
    }

    /// Handle one request. Returns `None` for notifications.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let is_notification = request.id.is_none();

        match request.method.as_str() {
            "initialize" => Some(self.handle_initialize(request.id)),
            "initialized" | "notifications/initialized" => {
                debug!("Received initialized notification");
                None
            }
            "notifications/cancelled" => {
                debug!("Received cancelled notification");
                None
            }
            "tools/list" => Some(self.handle_tools_list(request.id)),
            "tools/call" => Some(self.handle_tool_call(request.id, request.params).await),
            "ping" => Some(JsonRpcResponse::success(
                request.id,
                Value::Object(Default::default()),
            )),
            method if is_notification => {
                debug!(method = %method, "Unknown notification, ignoring");
                None
            }
            method => {
                warn!(method = %method, "Unknown method");
                Some(JsonRpcResponse::error(
                    request.id,
                    METHOD_NOT_FOUND,
                    format!("Method not found: {}", method),
                ))
            }
        }
    }

    fn handle_initialize(&self, id: Option<Value>) -> JsonRpcResponse {
        info!("Handling initialize request");

        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: Capabilities {
                tools: ToolCapabilities {
                    list_changed: false,
                },
            },
            server_info: ServerInfo {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };

        match serde_json::to_value(result) {
            Ok(val) => JsonRpcResponse::success(id, val),
            Err(e) => {
                error!(error = %e, "Failed to serialize initialize result");
                JsonRpcResponse::error(id, INTERNAL_ERROR, format!("Internal error: {}", e))
            }
        }
    }

    fn handle_tools_list(&self, id: Option<Value>) -> JsonRpcResponse {
        debug!("Handling tools/list request");
        JsonRpcResponse::success(id, json!({ "tools": all_tools(&self.state.diagram_settings) }))
    }

    async fn handle_tool_call(&self, id: Option<Value>, params: Option<Value>) -> JsonRpcResponse {
        let params: ToolCallParams = match params {
            Some(p) => match serde_json::from_value(p) {
                Ok(p) => p,
                Err(e) => {
                    return JsonRpcResponse::error(
                        id,
                        INVALID_PARAMS,
                        format!("Invalid params: {}", e),
                    );
                }
            },
            None => return JsonRpcResponse::error(id, INVALID_PARAMS, "Missing params"),
        };

        info!(tool = %params.name, "Handling tool call");

        let tool_result = match handle_tool_call(&self.state, &params.name, params.arguments).await
        {
            Ok(result) => {
                let text = serde_json::to_string_pretty(&result).unwrap_or_else(|e| {
                    error!(error = %e, "Failed to serialize tool result");
                    format!("{{\"error\": \"Serialization failed: {}\"}}", e)
                });
                ToolCallResult {
                    content: vec![ToolResultContent::text(text)],
                    is_error: None,
                }
            }
            Err(e) => {
                warn!(tool = %params.name, error = %e, "Tool call failed");
                ToolCallResult {
                    content: vec![ToolResultContent::text(tool_error_text(&e))],
                    is_error: Some(true),
                }
            }
        };

        match serde_json::to_value(tool_result) {
            Ok(val) => JsonRpcResponse::success(id, val),
            Err(e) => {
                error!(error = %e, "Failed to serialize tool call result");
                JsonRpcResponse::error(id, INTERNAL_ERROR, format!("Internal error: {}", e))
            }
        }
    }
}

/// Every tool this server advertises. Level bounds come from `settings`.
pub fn all_tools(settings: &DiagramSettings) -> Vec<Tool> {
    let session_id = ("session_id", string_schema("Session returned by analysis_start or diagram_generate"));

    vec![
        Tool::new(
            "argument_extract",
            "Extract the argument structure (sections, arguments, supporting details) from analysis text. Returns null when no structure is found.",
            object_schema(
                vec![("text", string_schema("Sectioned analysis text, one claim per line"))],
                &["text"],
            ),
        ),
        Tool::new(
            "analysis_start",
            "Analyze a scenario from several scenario-specific perspectives and extract the argument tree of the answer. Opens a new session.",
            object_schema(
                vec![(
                    "scenario",
                    string_schema("The scenario, dilemma or policy question to analyze"),
                )],
                &["scenario"],
            ),
        ),
        Tool::new(
            "analysis_follow_up",
            "Ask a follow-up question within an analysis session.",
            object_schema(
                vec![
                    session_id.clone(),
                    ("question", string_schema("The follow-up question")),
                ],
                &["session_id", "question"],
            ),
        ),
        Tool::new(
            "diagram_generate",
            "Generate the base (level 0) diagram for a topic, or replay it when already generated. Opens a session when only a topic is given. A session keeps one topic and kind until session_reset.",
            object_schema(
                vec![
                    (
                        "session_id",
                        string_schema("Existing session; its scenario is the default topic"),
                    ),
                    ("topic", string_schema("Topic to diagram")),
                    (
                        "kind",
                        enum_schema(
                            &["argument-flow", "stakeholder-analysis", "decision-tree", "process-flow"],
                            "Diagram kind (default: argument-flow)",
                        ),
                    ),
                ],
                &[],
            ),
        ),
        Tool::new(
            "diagram_set_level",
            "Show the session's diagram at a detail level. 0 is the base, positive levels add detail, negative levels simplify. Cached levels are replayed.",
            object_schema(
                vec![
                    session_id.clone(),
                    (
                        "level",
                        json!({
                            "type": "integer",
                            "minimum": settings.min_level,
                            "maximum": settings.max_level,
                            "description": "Target detail level"
                        }),
                    ),
                ],
                &["session_id", "level"],
            ),
        ),
        Tool::new(
            "diagram_step",
            "Move the session's diagram one detail level up or down.",
            object_schema(
                vec![
                    session_id.clone(),
                    ("direction", enum_schema(&["more", "less"], "More or less detail")),
                ],
                &["session_id", "direction"],
            ),
        ),
        Tool::new(
            "diagram_regenerate",
            "Discard every cached level and generate a new base diagram for the same topic.",
            object_schema(vec![session_id.clone()], &["session_id"]),
        ),
        Tool::new(
            "diagram_state",
            "Current level, displayed diagram and cached levels of the session's diagram.",
            object_schema(vec![session_id.clone()], &["session_id"]),
        ),
        Tool::new(
            "diagram_validate",
            "Check diagram DSL text: header present, node definitions present, identifiers used.",
            object_schema(vec![("dsl", string_schema("Diagram text to validate"))], &["dsl"]),
        ),
        Tool::new(
            "diagram_from_tree",
            "Render an argument tree to diagram DSL without calling the generator. Uses the given text, or the session's latest structured answer.",
            object_schema(
                vec![
                    ("text", string_schema("Analysis text to extract and render")),
                    (
                        "session_id",
                        string_schema("Session whose latest argument tree is rendered"),
                    ),
                ],
                &[],
            ),
        ),
        Tool::new(
            "session_reset",
            "Discard a session's conversation, argument trees and diagram.",
            object_schema(vec![session_id], &["session_id"]),
        ),
    ]
}

/// A closed object schema: unknown properties are rejected.
fn object_schema(properties: Vec<(&str, Value)>, required: &[&str]) -> Value {
    let properties: Map<String, Value> = properties
        .into_iter()
        .map(|(name, schema)| (name.to_string(), schema))
        .collect();
    let mut schema = json!({
        "type": "object",
        "properties": properties,
        "additionalProperties": false
    });
    if !required.is_empty() {
        schema["required"] = json!(required);
    }
    schema
}

fn string_schema(description: &str) -> Value {
    json!({ "type": "string", "description": description })
}

fn enum_schema(values: &[&str], description: &str) -> Value {
    json!({ "type": "string", "enum": values, "description": description })
}
