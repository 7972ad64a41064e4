//! In-memory analysis sessions.
//!
//! A session owns one scenario's conversation (each assistant turn annotated
//! with its argument tree) and, once requested, the diagram controller for
//! that scenario. Sessions share nothing with each other.
//!
//! A session diagrams one topic and kind for its whole lifetime; starting
//! another needs a session reset.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::argument::ArgumentTree;
use crate::diagram::{DiagramEnhancementController, DiagramKind};
use crate::error::ToolError;
use crate::langbase::{Message, MessageRole};

/// One message of an analysis conversation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationTurn {
    pub role: MessageRole,
    pub content: String,
    /// Only assistant turns carry a tree, and only when extraction succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub argument_tree: Option<ArgumentTree>,
    pub timestamp: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            argument_tree: None,
            timestamp: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>, argument_tree: Option<ArgumentTree>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            argument_tree,
            timestamp: Utc::now(),
        }
    }

    pub fn to_message(&self) -> Message {
        Message {
            role: self.role,
            content: self.content.clone(),
        }
    }
}

/// State of one analysis conversation.
pub struct AnalysisSession {
    id: String,
    scenario: String,
    created_at: DateTime<Utc>,
    turns: RwLock<Vec<ConversationTurn>>,
    diagram: RwLock<Option<Arc<DiagramEnhancementController>>>,
}

impl AnalysisSession {
    fn new(scenario: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            scenario: scenario.into(),
            created_at: Utc::now(),
            turns: RwLock::new(Vec::new()),
            diagram: RwLock::new(None),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn scenario(&self) -> &str {
        &self.scenario
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub async fn turns(&self) -> Vec<ConversationTurn> {
        self.turns.read().await.clone()
    }

    pub async fn push_turns(&self, new_turns: impl IntoIterator<Item = ConversationTurn>) {
        self.turns.write().await.extend(new_turns);
    }

    /// Conversation as pipe messages, oldest first.
    pub async fn history(&self) -> Vec<Message> {
        self.turns
            .read()
            .await
            .iter()
            .map(ConversationTurn::to_message)
            .collect()
    }

    pub async fn diagram(&self) -> Option<Arc<DiagramEnhancementController>> {
        self.diagram.read().await.clone()
    }

    /// The controller for `topic`/`kind`, created on first use.
    ///
    /// Fails when the session already diagrams another topic or kind, so
    /// cached levels are only ever discarded by a reset.
    pub async fn diagram_for(
        &self,
        topic: &str,
        kind: DiagramKind,
        create: impl FnOnce() -> DiagramEnhancementController,
    ) -> Result<Arc<DiagramEnhancementController>, ToolError> {
        let mut slot = self.diagram.write().await;
        match slot.as_ref() {
            Some(existing) if existing.topic() == topic && existing.kind() == kind => {
                Ok(Arc::clone(existing))
            }
            Some(existing) => Err(ToolError::Validation {
                field: if existing.topic() == topic { "kind" } else { "topic" }.to_string(),
                reason: format!(
                    "session {} already diagrams {:?} as {}; reset it to start another diagram",
                    self.id,
                    existing.topic(),
                    existing.kind().as_str()
                ),
            }),
            None => {
                let controller = Arc::new(create());
                *slot = Some(Arc::clone(&controller));
                Ok(controller)
            }
        }
    }
}

/// Live sessions kept before the oldest is evicted.
pub const DEFAULT_SESSION_LIMIT: usize = 64;

/// Registry of live sessions, bounded by a session limit.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Arc<AnalysisSession>>>,
    limit: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_limit(DEFAULT_SESSION_LIMIT)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store holding at most `limit` sessions (at least one).
    pub fn with_limit(limit: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            limit: limit.max(1),
        }
    }

    /// Open a session, evicting the oldest one when the store is full.
    pub async fn create(&self, scenario: &str) -> Arc<AnalysisSession> {
        let session = Arc::new(AnalysisSession::new(scenario));
        let mut sessions = self.sessions.write().await;
        while sessions.len() >= self.limit {
            let Some(oldest) = sessions
                .values()
                .min_by_key(|s| s.created_at)
                .map(|s| s.id.clone())
            else {
                break;
            };
            sessions.remove(&oldest);
            info!(session_id = %oldest, limit = self.limit, "Session evicted");
        }
        sessions.insert(session.id.clone(), Arc::clone(&session));
        info!(session_id = %session.id, "Session created");
        session
    }

    pub async fn get(&self, id: &str) -> Result<Arc<AnalysisSession>, ToolError> {
        self.sessions
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| ToolError::Session(format!("Session not found: {}", id)))
    }

    /// Drop a session with its conversation, trees and diagram document.
    pub async fn reset(&self, id: &str) -> bool {
        let removed = self.sessions.write().await.remove(id).is_some();
        if removed {
            info!(session_id = %id, "Session reset");
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
