use serde::Serialize;
use thiserror::Error;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Langbase error: {0}")]
    Langbase(#[from] LangbaseError),

    #[error("Diagram error: {0}")]
    Diagram(#[from] DiagramError),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Langbase API errors
#[derive(Debug, Error)]
pub enum LangbaseError {
    #[error("Langbase unavailable: {message} (retries: {retries})")]
    Unavailable { message: String, retries: u32 },

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// MCP protocol errors
#[derive(Debug, Error)]
pub enum McpError {
    #[error("Unknown tool: {tool_name}")]
    UnknownTool { tool_name: String },

    #[error("Invalid parameters for {tool_name}: {message}")]
    InvalidParameters { tool_name: String, message: String },

    #[error("Tool execution failed: {message}")]
    ExecutionFailed { message: String },

    #[error("{0}")]
    Diagram(#[from] DiagramError),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Tool-specific errors with structured details
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Validation failed: {field} - {reason}")]
    Validation { field: String, reason: String },

    #[error("Session error: {0}")]
    Session(String),
}

/// Internal argument-tree construction failures.
///
/// These never leave the extraction boundary: the extractor turns any of
/// them into "no tree" for its caller.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("Node handle {index} does not resolve")]
    DanglingHandle { index: usize },

    #[error("Node {id} is at level {found}, expected {expected}")]
    LevelMismatch {
        id: String,
        expected: u32,
        found: u32,
    },

    #[error("Duplicate node id: {id}")]
    DuplicateId { id: String },

    #[error("Node {id} is not listed as a child of its parent")]
    OrphanNode { id: String },

    #[error("No open section for argument: {text}")]
    NoOpenSection { text: String },
}

/// How a diagram failure should be treated by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureKind {
    /// The generator could not be reached or did not answer in time. Retry.
    GenerationUnavailable,
    /// The generator answered with unusable text. An identical retry will
    /// most likely fail the same way.
    SyntaxInvalid,
}

/// Diagram generation, enhancement and validation errors
#[derive(Debug, Clone, Error)]
pub enum DiagramError {
    #[error("Diagram generation unavailable: {message}")]
    GenerationUnavailable { message: String },

    #[error("Diagram syntax invalid: {reason}")]
    SyntaxInvalid { reason: String },

    #[error("Expanded diagram dropped {} existing node definitions", missing.len())]
    ContentNotPreserved { missing: Vec<String> },

    #[error("Identifier space exhausted: {capacity} identifiers available, {requested} more needed")]
    IdentifierSpaceExhausted { capacity: usize, requested: usize },

    #[error("No base diagram has been generated yet")]
    NoBaseDiagram,
}

impl DiagramError {
    /// Classify the failure. Precondition errors have no kind.
    pub fn kind(&self) -> Option<FailureKind> {
        match self {
            DiagramError::GenerationUnavailable { .. } => Some(FailureKind::GenerationUnavailable),
            DiagramError::SyntaxInvalid { .. } | DiagramError::ContentNotPreserved { .. } => {
                Some(FailureKind::SyntaxInvalid)
            }
            DiagramError::IdentifierSpaceExhausted { .. } | DiagramError::NoBaseDiagram => None,
        }
    }

    /// Whether repeating the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        self.kind() == Some(FailureKind::GenerationUnavailable)
    }
}

impl From<LangbaseError> for DiagramError {
    fn from(err: LangbaseError) -> Self {
        DiagramError::GenerationUnavailable {
            message: err.to_string(),
        }
    }
}

impl From<ToolError> for AppError {
    fn from(err: ToolError) -> Self {
        AppError::Internal {
            message: err.to_string(),
        }
    }
}

impl From<AppError> for McpError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::Diagram(diagram) => McpError::Diagram(diagram),
            other => McpError::ExecutionFailed {
                message: other.to_string(),
            },
        }
    }
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for Langbase operations
pub type LangbaseResult<T> = Result<T, LangbaseError>;

/// Result type alias for MCP operations
pub type McpResult<T> = Result<T, McpError>;

/// Result type alias for diagram operations
pub type DiagramResult<T> = Result<T, DiagramError>;
