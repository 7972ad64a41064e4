use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

use super::SharedState;
use crate::analysis::{FollowUpParams, StartParams};
use crate::argument::ArgumentTree;
use crate::diagram::{
    render_tree, validate, DiagramEnhancementController, DiagramKind, DiagramView,
    RenderedDiagram, ValidationReport,
};
use crate::error::{DiagramError, McpError, McpResult, ToolError};
use crate::session::AnalysisSession;

/// Route tool calls to appropriate handlers
pub async fn handle_tool_call(
    state: &SharedState,
    tool_name: &str,
    arguments: Option<Value>,
) -> McpResult<Value> {
    info!(tool = %tool_name, "Routing tool call");

    match tool_name {
        "argument_extract" => handle_argument_extract(state, arguments).await,
        "analysis_start" => handle_analysis_start(state, arguments).await,
        "analysis_follow_up" => handle_analysis_follow_up(state, arguments).await,
        "diagram_generate" => handle_diagram_generate(state, arguments).await,
        "diagram_set_level" => handle_diagram_set_level(state, arguments).await,
        "diagram_step" => handle_diagram_step(state, arguments).await,
        "diagram_regenerate" => handle_diagram_regenerate(state, arguments).await,
        "diagram_state" => handle_diagram_state(state, arguments).await,
        "diagram_validate" => handle_diagram_validate(arguments),
        "diagram_from_tree" => handle_diagram_from_tree(state, arguments).await,
        "session_reset" => handle_session_reset(state, arguments).await,
        _ => Err(McpError::UnknownTool {
            tool_name: tool_name.to_string(),
        }),
    }
}

// ============================================================================
// Argument extraction
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ExtractParams {
    pub text: String,
}

/// Extraction outcome; `argument_tree` is `null` when the text has no structure.
#[derive(Debug, Serialize)]
pub struct ExtractResponse {
    pub argument_tree: Option<ArgumentTree>,
    pub parsed: bool,
}

async fn handle_argument_extract(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    let params: ExtractParams = parse_arguments("argument_extract", arguments)?;
    let argument_tree = state.extractor.extract(&params.text);
    let response = ExtractResponse {
        parsed: argument_tree.is_some(),
        argument_tree,
    };
    serde_json::to_value(response).map_err(McpError::Json)
}

// ============================================================================
// Analysis turns
// ============================================================================

async fn handle_analysis_start(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    execute_handler("analysis_start", arguments, |params: StartParams| {
        state.analysis.start(params)
    })
    .await
}

async fn handle_analysis_follow_up(
    state: &SharedState,
    arguments: Option<Value>,
) -> McpResult<Value> {
    execute_handler("analysis_follow_up", arguments, |params: FollowUpParams| {
        state.analysis.follow_up(params)
    })
    .await
}

// ============================================================================
// Diagram management
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct DiagramGenerateParams {
    /// Existing session; a new one is opened for `topic` when absent.
    pub session_id: Option<String>,
    /// Defaults to the session scenario.
    pub topic: Option<String>,
    #[serde(default)]
    pub kind: DiagramKind,
}

#[derive(Debug, Deserialize)]
pub struct SessionParams {
    pub session_id: String,
}

#[derive(Debug, Deserialize)]
pub struct SetLevelParams {
    pub session_id: String,
    pub level: i32,
}

/// "more" or "less" detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepDirection {
    More,
    Less,
}

impl StepDirection {
    pub fn delta(self) -> i32 {
        match self {
            StepDirection::More => 1,
            StepDirection::Less => -1,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StepParams {
    pub session_id: String,
    pub direction: StepDirection,
}

/// A diagram view tagged with its session.
#[derive(Debug, Serialize)]
pub struct DiagramResponse {
    pub session_id: String,
    #[serde(flatten)]
    pub view: DiagramView,
}

impl DiagramResponse {
    fn to_value(session: &AnalysisSession, view: DiagramView) -> McpResult<Value> {
        serde_json::to_value(DiagramResponse {
            session_id: session.id().to_string(),
            view,
        })
        .map_err(McpError::Json)
    }
}

async fn handle_diagram_generate(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    let params: DiagramGenerateParams = parse_arguments("diagram_generate", arguments)?;
    let topic = params
        .topic
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty());

    let session = match (&params.session_id, topic) {
        (Some(id), _) => lookup_session(state, id).await?,
        (None, Some(topic)) => state.sessions.create(topic).await,
        (None, None) => {
            return Err(McpError::InvalidParameters {
                tool_name: "diagram_generate".to_string(),
                message: "Either session_id or topic is required".to_string(),
            })
        }
    };
    let topic = topic.unwrap_or_else(|| session.scenario()).to_string();

    let controller = session
        .diagram_for(&topic, params.kind, || {
            state.new_controller(&topic, params.kind)
        })
        .await
        .map_err(|e| McpError::InvalidParameters {
            tool_name: "diagram_generate".to_string(),
            message: e.to_string(),
        })?;
    let view = controller.generate_base().await?;
    DiagramResponse::to_value(&session, view)
}

async fn handle_diagram_set_level(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    let params: SetLevelParams = parse_arguments("diagram_set_level", arguments)?;
    let (session, controller) = session_diagram(state, &params.session_id).await?;
    let view = controller.set_level(params.level).await?;
    DiagramResponse::to_value(&session, view)
}

async fn handle_diagram_step(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    let params: StepParams = parse_arguments("diagram_step", arguments)?;
    let (session, controller) = session_diagram(state, &params.session_id).await?;
    let view = controller.step(params.direction.delta()).await?;
    DiagramResponse::to_value(&session, view)
}

async fn handle_diagram_regenerate(
    state: &SharedState,
    arguments: Option<Value>,
) -> McpResult<Value> {
    let params: SessionParams = parse_arguments("diagram_regenerate", arguments)?;
    let (session, controller) = session_diagram(state, &params.session_id).await?;
    let view = controller.regenerate().await?;
    DiagramResponse::to_value(&session, view)
}

async fn handle_diagram_state(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    let params: SessionParams = parse_arguments("diagram_state", arguments)?;
    let session = lookup_session(state, &params.session_id).await?;
    match session.diagram().await {
        Some(controller) => DiagramResponse::to_value(&session, controller.view().await),
        None => Ok(serde_json::json!({
            "session_id": session.id(),
            "diagram": null,
            "cachedLevels": [],
        })),
    }
}

fn handle_diagram_validate(arguments: Option<Value>) -> McpResult<Value> {
    #[derive(Deserialize)]
    struct ValidateParams {
        dsl: String,
    }

    let params: ValidateParams = parse_arguments("diagram_validate", arguments)?;
    let report: ValidationReport = validate(&params.dsl);
    debug!(valid = report.valid, "Diagram validated");
    serde_json::to_value(report).map_err(McpError::Json)
}

#[derive(Debug, Deserialize)]
pub struct FromTreeParams {
    /// Analysis text to extract and render.
    pub text: Option<String>,
    /// Render the latest structured turn of this session instead.
    pub session_id: Option<String>,
}

/// Rendered DSL together with its own validation verdict.
#[derive(Debug, Serialize)]
pub struct FromTreeResponse {
    #[serde(flatten)]
    pub rendered: RenderedDiagram,
    pub validation: ValidationReport,
}

async fn handle_diagram_from_tree(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    let params: FromTreeParams = parse_arguments("diagram_from_tree", arguments)?;

    let tree = match (params.text, params.session_id) {
        (Some(text), _) => state.extractor.extract(&text),
        (None, Some(id)) => {
            let session = lookup_session(state, &id).await?;
            session
                .turns()
                .await
                .into_iter()
                .rev()
                .find_map(|turn| turn.argument_tree)
        }
        (None, None) => {
            return Err(McpError::InvalidParameters {
                tool_name: "diagram_from_tree".to_string(),
                message: "Either text or session_id is required".to_string(),
            })
        }
    };

    let tree = tree.ok_or_else(|| McpError::ExecutionFailed {
        message: "No argument structure found to render".to_string(),
    })?;
    let rendered = render_tree(&tree, state.diagram_settings.max_node_ids);
    let validation = validate(&rendered.dsl);
    serde_json::to_value(FromTreeResponse {
        rendered,
        validation,
    })
    .map_err(McpError::Json)
}

// ============================================================================
// Sessions
// ============================================================================

async fn handle_session_reset(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    let params: SessionParams = parse_arguments("session_reset", arguments)?;
    let reset = state.sessions.reset(&params.session_id).await;
    Ok(serde_json::json!({
        "session_id": params.session_id,
        "reset": reset,
    }))
}

// ============================================================================
// Helper functions
// ============================================================================

async fn lookup_session(state: &SharedState, id: &str) -> McpResult<Arc<AnalysisSession>> {
    state
        .sessions
        .get(id)
        .await
        .map_err(|e: ToolError| McpError::ExecutionFailed {
            message: e.to_string(),
        })
}

/// The session and its diagram controller. A session without one has no base.
async fn session_diagram(
    state: &SharedState,
    id: &str,
) -> McpResult<(Arc<AnalysisSession>, Arc<DiagramEnhancementController>)> {
    let session = lookup_session(state, id).await?;
    let controller = session
        .diagram()
        .await
        .ok_or(McpError::Diagram(DiagramError::NoBaseDiagram))?;
    Ok((session, controller))
}

/// Helper to parse arguments with consistent error handling
fn parse_arguments<T: serde::de::DeserializeOwned>(
    tool_name: &str,
    arguments: Option<Value>,
) -> McpResult<T> {
    match arguments {
        Some(args) => serde_json::from_value(args).map_err(|e| McpError::InvalidParameters {
            tool_name: tool_name.to_string(),
            message: e.to_string(),
        }),
        None => Err(McpError::InvalidParameters {
            tool_name: tool_name.to_string(),
            message: "Missing arguments".to_string(),
        }),
    }
}

/// Parse, run and serialize a mode operation.
async fn execute_handler<P, R, E, F, Fut>(
    tool_name: &str,
    arguments: Option<Value>,
    operation: F,
) -> McpResult<Value>
where
    P: serde::de::DeserializeOwned,
    R: Serialize,
    E: Into<McpError>,
    F: FnOnce(P) -> Fut,
    Fut: std::future::Future<Output = Result<R, E>>,
{
    let params: P = parse_arguments(tool_name, arguments)?;
    let result = operation(params).await.map_err(Into::into)?;
    serde_json::to_value(result).map_err(McpError::Json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_arguments_missing() {
        let result: McpResult<ExtractParams> = parse_arguments("argument_extract", None);
        match result {
            Err(McpError::InvalidParameters { tool_name, message }) => {
                assert_eq!(tool_name, "argument_extract");
                assert_eq!(message, "Missing arguments");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_parse_arguments_wrong_type() {
        let result: McpResult<SetLevelParams> = parse_arguments(
            "diagram_set_level",
            Some(json!({"session_id": "s", "level": "high"})),
        );
        assert!(matches!(result, Err(McpError::InvalidParameters { .. })));
    }

    #[test]
    fn test_parse_generate_params_defaults_kind() {
        let params: DiagramGenerateParams =
            parse_arguments("diagram_generate", Some(json!({"topic": "Rent control"}))).unwrap();
        assert_eq!(params.kind, DiagramKind::ArgumentFlow);
        assert!(params.session_id.is_none());

        let params: DiagramGenerateParams = parse_arguments(
            "diagram_generate",
            Some(json!({"session_id": "s", "kind": "stakeholder-analysis"})),
        )
        .unwrap();
        assert_eq!(params.kind, DiagramKind::StakeholderAnalysis);
    }

    #[test]
    fn test_parse_step_direction() {
        let params: StepParams = parse_arguments(
            "diagram_step",
            Some(json!({"session_id": "s", "direction": "less"})),
        )
        .unwrap();
        assert_eq!(params.direction.delta(), -1);

        let result: McpResult<StepParams> = parse_arguments(
            "diagram_step",
            Some(json!({"session_id": "s", "direction": "sideways"})),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_from_tree_params_all_optional() {
        let params: FromTreeParams = parse_arguments("diagram_from_tree", Some(json!({}))).unwrap();
        assert!(params.text.is_none());
        assert!(params.session_id.is_none());
    }

    #[test]
    fn test_validate_handler_reports_failure_without_error() {
        let value = handle_diagram_validate(Some(json!({"dsl": "A --> B"}))).unwrap();
        assert_eq!(value["valid"], false);
        assert!(value["reason"].is_string());
    }
}
