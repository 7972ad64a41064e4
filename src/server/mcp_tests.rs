//! Unit tests for the MCP protocol layer.
//!
//! Covers JSON-RPC envelopes, tool definitions and full request/response
//! exchanges through [`McpServer::serve`] with an in-process generator.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use super::*;
use crate::argument::ArgumentExtractor;
use crate::config::{
    Config, DiagramConfig, LangbaseConfig, LoggingConfig, PipeConfig, RequestConfig,
};
use crate::diagram::{DiagramGenerator, DiagramKind, DiagramSettings, EnhancementRequest};
use crate::error::{DiagramError, DiagramResult};
use crate::langbase::LangbaseClient;
use crate::server::AppState;

const BASE: &str = "graph TD\n    A[Rent cap] --> B{Supply falls?}\n    B -->|yes| C((Shortage))";

/// Returns a fixed base and appends one node per expansion.
struct ScriptedGenerator;

#[async_trait]
impl DiagramGenerator for ScriptedGenerator {
    async fn generate(&self, topic: &str, _kind: DiagramKind) -> DiagramResult<String> {
        if topic == "unreachable" {
            return Err(DiagramError::GenerationUnavailable {
                message: "connection refused".to_string(),
            });
        }
        Ok(BASE.to_string())
    }

    async fn enhance(&self, request: &EnhancementRequest) -> DiagramResult<String> {
        let id = request.next_ids.first().copied().unwrap_or('Z');
        Ok(format!("{}\n    {}[Detail] --> A", request.basis, id))
    }
}

fn test_state() -> SharedState {
    state_with(DiagramConfig::default())
}

fn state_with(diagram: DiagramConfig) -> SharedState {
    let config = Config {
        langbase: LangbaseConfig {
            api_key: "test-key".to_string(),
            base_url: "http://127.0.0.1:9".to_string(),
        },
        logging: LoggingConfig::default(),
        request: RequestConfig::default(),
        pipes: PipeConfig::default(),
        diagram,
        rules_path: None,
    };
    let langbase = Arc::new(LangbaseClient::new(&config.langbase, config.request.clone()).unwrap());
    Arc::new(AppState::with_generator(
        config,
        langbase,
        ArgumentExtractor::default(),
        Arc::new(ScriptedGenerator),
    ))
}

async fn exchange(server: &McpServer, requests: &[Value]) -> Vec<Value> {
    let input: String = requests
        .iter()
        .map(|r| format!("{}\n", r))
        .collect();
    let mut output = Vec::new();
    server.serve(input.as_bytes(), &mut output).await.unwrap();
    String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

async fn call_tool(server: &McpServer, name: &str, arguments: Value) -> Value {
    let responses = exchange(
        server,
        &[json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "tools/call",
            "params": {"name": name, "arguments": arguments}
        })],
    )
    .await;
    responses[0]["result"].clone()
}

fn tool_payload(result: &Value) -> Value {
    let text = result["content"][0]["text"].as_str().unwrap();
    serde_json::from_str(text).unwrap()
}

// ============================================================================
// Envelope types
// ============================================================================

#[test]
fn test_jsonrpc_response_success_with_id() {
    let response = JsonRpcResponse::success(Some(json!(1)), json!({"result": "ok"}));

    assert_eq!(response.jsonrpc, "2.0");
    assert_eq!(response.id, json!(1));
    assert!(response.error.is_none());
    assert_eq!(response.result.unwrap()["result"], "ok");
}

#[test]
fn test_jsonrpc_response_error_without_id() {
    let response = JsonRpcResponse::error(None, -32700, "Parse error");

    assert_eq!(response.id, Value::Null);
    assert!(response.result.is_none());
    assert_eq!(response.error.unwrap().code, -32700);
}

#[test]
fn test_jsonrpc_response_serialization_omits_missing_parts() {
    let ok = serde_json::to_string(&JsonRpcResponse::success(Some(json!(1)), json!({}))).unwrap();
    assert!(ok.contains("\"jsonrpc\":\"2.0\""));
    assert!(!ok.contains("\"error\""));

    let err =
        serde_json::to_string(&JsonRpcResponse::error(Some(json!(1)), -32601, "nope")).unwrap();
    assert!(err.contains("-32601"));
    assert!(!err.contains("\"result\""));
    assert!(!err.contains("\"data\""));
}

#[test]
fn test_jsonrpc_notification_has_no_id() {
    let request: JsonRpcRequest =
        serde_json::from_value(json!({"jsonrpc": "2.0", "method": "initialized"})).unwrap();
    assert!(request.id.is_none());
    assert!(request.params.is_none());
}

#[test]
fn test_tool_call_result_field_names() {
    let result = ToolCallResult {
        content: vec![ToolResultContent::text("hi")],
        is_error: Some(true),
    };
    let value = serde_json::to_value(result).unwrap();
    assert_eq!(value["content"][0]["type"], "text");
    assert_eq!(value["isError"], true);
}

#[test]
fn test_tool_error_text_for_diagram_failures() {
    let err = McpError::Diagram(DiagramError::GenerationUnavailable {
        message: "timeout".to_string(),
    });
    let body: Value = serde_json::from_str(&tool_error_text(&err)).unwrap();
    assert_eq!(body["kind"], "generation-unavailable");
    assert_eq!(body["retryable"], true);

    let err = McpError::Diagram(DiagramError::NoBaseDiagram);
    let body: Value = serde_json::from_str(&tool_error_text(&err)).unwrap();
    assert_eq!(body["kind"], Value::Null);
    assert_eq!(body["retryable"], false);

    let err = McpError::UnknownTool {
        tool_name: "x".to_string(),
    };
    assert_eq!(tool_error_text(&err), "Error: Unknown tool: x");
}

// ============================================================================
// Tool definitions
// ============================================================================

#[test]
fn test_all_tools_listed_once() {
    let tools = all_tools(&DiagramSettings::default());
    let mut names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names.len(), 11);
    names.sort_unstable();
    names.dedup();
    assert_eq!(names.len(), 11);
}

#[test]
fn test_all_tools_have_object_schemas() {
    for tool in all_tools(&DiagramSettings::default()) {
        assert_eq!(tool.input_schema["type"], "object", "{}", tool.name);
        assert_eq!(
            tool.input_schema["additionalProperties"], false,
            "{}",
            tool.name
        );
        assert!(!tool.description.is_empty());
    }
}

#[test]
fn test_set_level_schema_bounds() {
    let tool = all_tools(&DiagramSettings::default())
        .into_iter()
        .find(|t| t.name == "diagram_set_level")
        .unwrap();
    let level = &tool.input_schema["properties"]["level"];
    assert_eq!(level["minimum"], -2);
    assert_eq!(level["maximum"], 10);
    assert_eq!(tool.input_schema["required"], json!(["session_id", "level"]));
}

#[test]
fn test_set_level_schema_follows_configured_bounds() {
    let settings = DiagramSettings {
        min_level: -1,
        max_level: 4,
        ..DiagramSettings::default()
    };
    let tool = all_tools(&settings)
        .into_iter()
        .find(|t| t.name == "diagram_set_level")
        .unwrap();
    let level = &tool.input_schema["properties"]["level"];
    assert_eq!(level["minimum"], -1);
    assert_eq!(level["maximum"], 4);
}

#[test]
fn test_optional_only_schemas_have_no_required_list() {
    for name in ["diagram_generate", "diagram_from_tree"] {
        let tool = all_tools(&DiagramSettings::default())
            .into_iter()
            .find(|t| t.name == name)
            .unwrap();
        assert!(tool.input_schema.get("required").is_none(), "{}", name);
    }
}

// ============================================================================
// Request handling
// ============================================================================

#[tokio::test]
async fn test_initialize_and_notifications() {
    let server = McpServer::new(test_state());
    let responses = exchange(
        &server,
        &[
            json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}),
            json!({"jsonrpc": "2.0", "method": "initialized"}),
            json!({"jsonrpc": "2.0", "method": "notifications/cancelled"}),
            json!({"jsonrpc": "2.0", "method": "something/else"}),
            json!({"jsonrpc": "2.0", "id": 2, "method": "ping"}),
        ],
    )
    .await;

    assert_eq!(responses.len(), 2);
    assert_eq!(responses[0]["result"]["protocolVersion"], PROTOCOL_VERSION);
    assert_eq!(
        responses[0]["result"]["serverInfo"]["name"],
        env!("CARGO_PKG_NAME")
    );
    assert_eq!(responses[1]["id"], 2);
    assert_eq!(responses[1]["result"], json!({}));
}

#[tokio::test]
async fn test_tools_list_advertises_configured_level_bounds() {
    let server = McpServer::new(state_with(DiagramConfig {
        min_level: -1,
        max_level: 4,
        ..DiagramConfig::default()
    }));
    let responses = exchange(
        &server,
        &[json!({"jsonrpc": "2.0", "id": 3, "method": "tools/list"})],
    )
    .await;

    let tools = responses[0]["result"]["tools"].as_array().unwrap();
    let set_level = tools
        .iter()
        .find(|t| t["name"] == "diagram_set_level")
        .unwrap();
    let level = &set_level["inputSchema"]["properties"]["level"];
    assert_eq!(level["minimum"], -1);
    assert_eq!(level["maximum"], 4);
}

#[tokio::test]
async fn test_parse_error_and_unknown_method() {
    let server = McpServer::new(test_state());
    let mut output = Vec::new();
    let input = "{not json\n\n{\"jsonrpc\":\"2.0\",\"id\":7,\"method\":\"nope\"}\n";
    server.serve(input.as_bytes(), &mut output).await.unwrap();

    let responses: Vec<Value> = String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(responses.len(), 2);
    assert_eq!(responses[0]["error"]["code"], -32700);
    assert_eq!(responses[0]["id"], Value::Null);
    assert_eq!(responses[1]["error"]["code"], -32601);
    assert_eq!(responses[1]["id"], 7);
}

#[tokio::test]
async fn test_tools_call_without_params_is_invalid() {
    let server = McpServer::new(test_state());
    let responses = exchange(
        &server,
        &[json!({"jsonrpc": "2.0", "id": 3, "method": "tools/call"})],
    )
    .await;
    assert_eq!(responses[0]["error"]["code"], -32602);
}

#[tokio::test]
async fn test_unknown_tool_is_tool_error() {
    let server = McpServer::new(test_state());
    let result = call_tool(&server, "reasoning_linear", json!({})).await;
    assert_eq!(result["isError"], true);
    assert!(result["content"][0]["text"]
        .as_str()
        .unwrap()
        .contains("Unknown tool"));
}

#[tokio::test]
async fn test_argument_extract_tool() {
    let server = McpServer::new(test_state());
    let text = "Utilitarian Analysis:\nThis clearly benefits society through measurable welfare gains.\nHowever critics argue it ignores individual rights.\n";

    let payload = tool_payload(&call_tool(&server, "argument_extract", json!({"text": text})).await);
    assert_eq!(payload["parsed"], true);
    assert_eq!(payload["argument_tree"]["totalNodes"], 4);
    assert_eq!(payload["argument_tree"]["maxDepth"], 3);

    let payload = tool_payload(&call_tool(&server, "argument_extract", json!({"text": ""})).await);
    assert_eq!(payload["parsed"], true);
    assert_eq!(payload["argument_tree"]["totalNodes"], 1);
}

#[tokio::test]
async fn test_diagram_validate_tool() {
    let server = McpServer::new(test_state());
    let payload =
        tool_payload(&call_tool(&server, "diagram_validate", json!({"dsl": BASE})).await);
    assert_eq!(payload["valid"], true);
}

#[tokio::test]
async fn test_diagram_lifecycle_through_tools() {
    let state = test_state();
    let server = McpServer::new(Arc::clone(&state));

    let generated =
        tool_payload(&call_tool(&server, "diagram_generate", json!({"topic": "Rent control"})).await);
    let session_id = generated["session_id"].as_str().unwrap().to_string();
    assert_eq!(generated["currentLevel"], 0);
    assert_eq!(generated["diagram"], BASE);
    assert_eq!(generated["outcome"], "generated");

    let expanded = tool_payload(
        &call_tool(
            &server,
            "diagram_step",
            json!({"session_id": session_id, "direction": "more"}),
        )
        .await,
    );
    assert_eq!(expanded["currentLevel"], 1);
    assert!(expanded["diagram"].as_str().unwrap().contains("D[Detail]"));

    let replay = tool_payload(
        &call_tool(
            &server,
            "diagram_set_level",
            json!({"session_id": session_id, "level": 0}),
        )
        .await,
    );
    assert_eq!(replay["outcome"], "cache-hit");

    let out_of_range = tool_payload(
        &call_tool(
            &server,
            "diagram_set_level",
            json!({"session_id": session_id, "level": 11}),
        )
        .await,
    );
    assert_eq!(out_of_range["outcome"], "out-of-range");
    assert_eq!(out_of_range["currentLevel"], 0);

    let regenerated = tool_payload(
        &call_tool(&server, "diagram_regenerate", json!({"session_id": session_id})).await,
    );
    assert_eq!(regenerated["epoch"], 1);
    assert_eq!(regenerated["cachedLevels"], json!([0]));

    let reset =
        tool_payload(&call_tool(&server, "session_reset", json!({"session_id": session_id})).await);
    assert_eq!(reset["reset"], true);
    assert!(state.sessions.is_empty().await);
}

#[tokio::test]
async fn test_diagram_generate_refuses_second_topic_in_session() {
    let server = McpServer::new(test_state());
    let generated =
        tool_payload(&call_tool(&server, "diagram_generate", json!({"topic": "Rent control"})).await);
    let session_id = generated["session_id"].as_str().unwrap().to_string();
    call_tool(
        &server,
        "diagram_set_level",
        json!({"session_id": session_id, "level": 1}),
    )
    .await;

    let result = call_tool(
        &server,
        "diagram_generate",
        json!({"session_id": session_id, "topic": "Zoning reform"}),
    )
    .await;
    assert_eq!(result["isError"], true);
    let text = result["content"][0]["text"].as_str().unwrap();
    assert!(text.contains("Invalid parameters for diagram_generate"), "{}", text);
    assert!(text.contains("Rent control"), "{}", text);

    let state = tool_payload(
        &call_tool(&server, "diagram_state", json!({"session_id": session_id})).await,
    );
    assert_eq!(state["topic"], "Rent control");
    assert_eq!(state["cachedLevels"], json!([0, 1]));
}

#[tokio::test]
async fn test_set_level_before_generation_reports_missing_base() {
    let state = test_state();
    let session = state.sessions.create("Rent control").await;
    let server = McpServer::new(Arc::clone(&state));

    let result = call_tool(
        &server,
        "diagram_set_level",
        json!({"session_id": session.id(), "level": 1}),
    )
    .await;
    assert_eq!(result["isError"], true);
    let body = tool_payload(&result);
    assert_eq!(body["retryable"], false);

    let state_view =
        tool_payload(&call_tool(&server, "diagram_state", json!({"session_id": session.id()})).await);
    assert_eq!(state_view["diagram"], Value::Null);
}

#[tokio::test]
async fn test_generation_failure_is_retryable_tool_error() {
    let server = McpServer::new(test_state());
    let result = call_tool(&server, "diagram_generate", json!({"topic": "unreachable"})).await;
    assert_eq!(result["isError"], true);
    let body = tool_payload(&result);
    assert_eq!(body["kind"], "generation-unavailable");
    assert_eq!(body["retryable"], true);
}

#[tokio::test]
async fn test_diagram_from_tree_tool() {
    let server = McpServer::new(test_state());
    let text = "Rights-Based Analysis:\nThis policy clearly violates individual autonomy and consent.\nEvidence from surveys shows strong opposition.\n";

    let payload =
        tool_payload(&call_tool(&server, "diagram_from_tree", json!({"text": text})).await);
    assert_eq!(payload["validation"]["valid"], true);
    assert!(payload["dsl"].as_str().unwrap().starts_with("graph TD"));
    assert_eq!(payload["omittedNodes"], 0);

    let result = call_tool(&server, "diagram_from_tree", json!({})).await;
    assert_eq!(result["isError"], true);
}

#[tokio::test]
async fn test_session_tools_reject_unknown_session() {
    let server = McpServer::new(test_state());
    let result = call_tool(&server, "diagram_state", json!({"session_id": "missing"})).await;
    assert_eq!(result["isError"], true);
    assert!(result["content"][0]["text"]
        .as_str()
        .unwrap()
        .contains("Session not found"));

    let payload =
        tool_payload(&call_tool(&server, "session_reset", json!({"session_id": "missing"})).await);
    assert_eq!(payload["reset"], false);
}
