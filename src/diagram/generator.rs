//! The external diagram generator seam.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::extract::extract_diagram;
use crate::error::DiagramResult;
use crate::langbase::{LangbaseClient, Message, PipeRequest};
use crate::prompts::{diagram_prompt, expand_prompt, simplify_prompt, DIAGRAM_ENHANCE_PROMPT, DIAGRAM_PROMPT};

/// Which way an enhancement moves the detail level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Expand,
    Simplify,
}

impl Direction {
    /// Direction towards `level` from the base diagram.
    pub fn for_level(level: i32) -> Option<Self> {
        match level.signum() {
            1 => Some(Direction::Expand),
            -1 => Some(Direction::Simplify),
            _ => None,
        }
    }
}

/// Diagram flavour requested from the generator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagramKind {
    #[default]
    ArgumentFlow,
    StakeholderAnalysis,
    DecisionTree,
    ProcessFlow,
}

impl DiagramKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagramKind::ArgumentFlow => "argument-flow",
            DiagramKind::StakeholderAnalysis => "stakeholder-analysis",
            DiagramKind::DecisionTree => "decision-tree",
            DiagramKind::ProcessFlow => "process-flow",
        }
    }
}

/// Everything the generator needs to expand or simplify a diagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnhancementRequest {
    pub topic: String,
    /// The diagram the result must be derived from.
    pub basis: String,
    pub direction: Direction,
    pub target_level: i32,
    /// Identifiers new nodes must use when expanding.
    pub next_ids: Vec<char>,
}

/// Produces diagram DSL text. Output is untrusted and validated by the caller.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DiagramGenerator: Send + Sync {
    /// A fresh base diagram for `topic`.
    async fn generate(&self, topic: &str, kind: DiagramKind) -> DiagramResult<String>;

    /// A transformed version of `request.basis`.
    async fn enhance(&self, request: &EnhancementRequest) -> DiagramResult<String>;
}

/// Generator backed by two Langbase pipes.
#[derive(Clone)]
pub struct LangbaseDiagramGenerator {
    langbase: Arc<LangbaseClient>,
    diagram_pipe: String,
    enhance_pipe: String,
}

impl LangbaseDiagramGenerator {
    pub fn new(
        langbase: Arc<LangbaseClient>,
        diagram_pipe: impl Into<String>,
        enhance_pipe: impl Into<String>,
    ) -> Self {
        Self {
            langbase,
            diagram_pipe: diagram_pipe.into(),
            enhance_pipe: enhance_pipe.into(),
        }
    }

    async fn run(&self, pipe: &str, system: &str, user: String) -> DiagramResult<String> {
        let request = PipeRequest::new(pipe, vec![Message::system(system), Message::user(user)]);
        let response = self.langbase.call_pipe(request).await?;
        let diagram = extract_diagram(&response.completion);
        debug!(pipe = %pipe, chars = diagram.len(), "Diagram text received");
        Ok(diagram.to_string())
    }
}

#[async_trait]
impl DiagramGenerator for LangbaseDiagramGenerator {
    async fn generate(&self, topic: &str, kind: DiagramKind) -> DiagramResult<String> {
        self.run(
            &self.diagram_pipe,
            DIAGRAM_PROMPT,
            diagram_prompt(topic, kind.as_str()),
        )
        .await
    }

    async fn enhance(&self, request: &EnhancementRequest) -> DiagramResult<String> {
        let prompt = match request.direction {
            Direction::Expand => expand_prompt(
                &request.topic,
                &request.basis,
                request.target_level,
                &request.next_ids,
            ),
            Direction::Simplify => {
                simplify_prompt(&request.topic, &request.basis, request.target_level)
            }
        };
        self.run(&self.enhance_pipe, DIAGRAM_ENHANCE_PROMPT, prompt).await
    }
}
