//! Multi-perspective analysis turns.
//!
//! An initial turn discovers scenario-specific perspectives, asks the analysis
//! pipe for a sectioned plain-text answer and extracts its argument tree.
//! Follow-up turns replay the conversation and are extracted the same way.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::argument::{ArgumentExtractor, ArgumentTree};
use crate::config::Config;
use crate::error::{AppResult, ToolError};
use crate::langbase::{LangbaseClient, Message};
use crate::prompts::{
    analysis_system_prompt, analysis_user_prompt, perspectives_prompt, FALLBACK_PERSPECTIVES,
    FOLLOW_UP_PROMPT,
};
use crate::session::{ConversationTurn, SessionStore};

/// Most perspectives kept from discovery.
const MAX_PERSPECTIVES: usize = 6;
/// Fewer usable perspectives than this falls back to the fixed list.
const MIN_PERSPECTIVES: usize = 3;

const EMPTY_COMPLETION: &str = "No response generated";

/// Input parameters for an initial analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartParams {
    /// The scenario or topic to analyze
    pub scenario: String,
}

/// Input parameters for a follow-up question
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowUpParams {
    pub session_id: String,
    pub question: String,
}

/// Result of one analysis turn
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    pub session_id: String,
    /// Perspectives the analysis was structured around (initial turn only)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub perspectives: Vec<String>,
    pub response: String,
    /// `null` when the response could not be structured
    pub argument_tree: Option<ArgumentTree>,
    pub parsed: bool,
}

/// Analysis mode handler
pub struct AnalysisMode {
    langbase: Arc<LangbaseClient>,
    sessions: Arc<SessionStore>,
    extractor: ArgumentExtractor,
    perspectives_pipe: String,
    analysis_pipe: String,
}

impl AnalysisMode {
    pub fn new(
        langbase: Arc<LangbaseClient>,
        sessions: Arc<SessionStore>,
        extractor: ArgumentExtractor,
        config: &Config,
    ) -> Self {
        Self {
            langbase,
            sessions,
            extractor,
            perspectives_pipe: config.pipes.perspectives.clone(),
            analysis_pipe: config.pipes.analysis.clone(),
        }
    }

    /// Run the first turn for a new scenario and open a session for it.
    pub async fn start(&self, params: StartParams) -> AppResult<AnalysisResult> {
        let start = Instant::now();
        let scenario = params.scenario.trim();
        if scenario.is_empty() {
            return Err(ToolError::Validation {
                field: "scenario".to_string(),
                reason: "Scenario cannot be empty".to_string(),
            }
            .into());
        }

        let perspectives = self.discover_perspectives(scenario).await;
        let messages = vec![
            Message::system(analysis_system_prompt(&perspectives)),
            Message::user(analysis_user_prompt(scenario)),
        ];
        let raw = self.langbase.complete(&self.analysis_pipe, messages).await?;
        let response = clean_response(&raw);
        let argument_tree = self.extractor.extract(&response);

        let session = self.sessions.create(scenario).await;
        session
            .push_turns([
                ConversationTurn::user(analysis_user_prompt(scenario)),
                ConversationTurn::assistant(&response, argument_tree.clone()),
            ])
            .await;

        info!(
            session_id = %session.id(),
            perspectives = perspectives.len(),
            parsed = argument_tree.is_some(),
            latency_ms = start.elapsed().as_millis(),
            "Analysis completed"
        );

        Ok(AnalysisResult {
            session_id: session.id().to_string(),
            perspectives,
            parsed: argument_tree.is_some(),
            response,
            argument_tree,
        })
    }

    /// Answer a follow-up question with the session's conversation as context.
    pub async fn follow_up(&self, params: FollowUpParams) -> AppResult<AnalysisResult> {
        let start = Instant::now();
        if params.question.trim().is_empty() {
            return Err(ToolError::Validation {
                field: "question".to_string(),
                reason: "Question cannot be empty".to_string(),
            }
            .into());
        }
        let session = self.sessions.get(&params.session_id).await?;

        let mut messages = vec![Message::system(FOLLOW_UP_PROMPT)];
        messages.extend(session.history().await);
        messages.push(Message::user(&params.question));

        let raw = self.langbase.complete(&self.analysis_pipe, messages).await?;
        let response = clean_response(&raw);
        let argument_tree = self.extractor.extract(&response);

        session
            .push_turns([
                ConversationTurn::user(&params.question),
                ConversationTurn::assistant(&response, argument_tree.clone()),
            ])
            .await;

        info!(
            session_id = %session.id(),
            parsed = argument_tree.is_some(),
            latency_ms = start.elapsed().as_millis(),
            "Follow-up completed"
        );

        Ok(AnalysisResult {
            session_id: session.id().to_string(),
            perspectives: Vec::new(),
            parsed: argument_tree.is_some(),
            response,
            argument_tree,
        })
    }

    /// Scenario-specific perspectives, or the fixed fallback list.
    pub async fn discover_perspectives(&self, scenario: &str) -> Vec<String> {
        let messages = vec![Message::user(perspectives_prompt(scenario))];
        match self.langbase.complete(&self.perspectives_pipe, messages).await {
            Ok(completion) => parse_perspectives(&clean_response(&completion)),
            Err(e) => {
                warn!(error = %e, "Perspective discovery failed, using fallback list");
                fallback_perspectives()
            }
        }
    }
}

/// Usable perspective lines from a discovery completion.
pub fn parse_perspectives(completion: &str) -> Vec<String> {
    let perspectives: Vec<String> = completion
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.contains("Scenario:"))
        .take(MAX_PERSPECTIVES)
        .map(str::to_string)
        .collect();

    if perspectives.len() < MIN_PERSPECTIVES {
        debug!(found = perspectives.len(), "Too few perspectives, using fallback list");
        return fallback_perspectives();
    }
    perspectives
}

pub fn fallback_perspectives() -> Vec<String> {
    FALLBACK_PERSPECTIVES.iter().map(|p| p.to_string()).collect()
}

/// Strip reasoning tags and collapse runs of blank lines.
pub fn clean_response(raw: &str) -> String {
    let without_blocks = strip_think_blocks(raw);
    let without_tags = strip_stray_tags(&without_blocks);
    let cleaned = collapse_blank_lines(&without_tags);
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        EMPTY_COMPLETION.to_string()
    } else {
        cleaned.to_string()
    }
}

const THINK_OPEN: &str = "<think>";
const THINK_CLOSE: &str = "</think>";

/// Remove every `<think>...</think>` block, case-insensitively.
fn strip_think_blocks(text: &str) -> String {
    let lowered = text.to_ascii_lowercase();
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    while let Some(open) = lowered[cursor..].find(THINK_OPEN).map(|i| cursor + i) {
        let Some(close) = lowered[open..].find(THINK_CLOSE).map(|i| open + i) else {
            break;
        };
        out.push_str(&text[cursor..open]);
        cursor = close + THINK_CLOSE.len();
    }
    out.push_str(&text[cursor..]);
    out
}

/// Remove unmatched `<think>` and `</think>` tags, case-insensitively.
fn strip_stray_tags(text: &str) -> String {
    let lowered = text.to_ascii_lowercase();
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    while cursor < text.len() {
        let rest = &lowered[cursor..];
        let tag_len = [THINK_OPEN, THINK_CLOSE]
            .iter()
            .find(|tag| rest.starts_with(**tag))
            .map(|tag| tag.len());
        match tag_len {
            Some(len) => cursor += len,
            None => {
                let ch_len = text[cursor..].chars().next().map_or(1, char::len_utf8);
                out.push_str(&text[cursor..cursor + ch_len]);
                cursor += ch_len;
            }
        }
    }
    out
}

/// Whitespace runs holding three or more newlines become one blank line.
fn collapse_blank_lines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(newline) = rest.find('\n') {
        out.push_str(&rest[..newline]);
        let run = &rest[newline..];
        let run_len = run
            .find(|c: char| !c.is_whitespace())
            .unwrap_or(run.len());
        let whitespace = &run[..run_len];
        if whitespace.matches('\n').count() >= 3 {
            // Keep indentation that follows the last newline of the run.
            let last_newline = whitespace.rfind('\n').unwrap_or(0);
            out.push_str("\n\n");
            rest = &run[last_newline + 1..];
        } else {
            out.push('\n');
            rest = &run[1..];
        }
    }
    out.push_str(rest);
    out
}
