use serde::{Deserialize, Serialize};

/// One chat message sent to a pipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl Message {
    fn with_role(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(MessageRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(MessageRole::Assistant, content)
    }
}

/// Body of `POST /v1/pipes/run`. Always non-streaming.
#[derive(Debug, Clone, Serialize)]
pub struct PipeRequest {
    pub name: String,
    pub messages: Vec<Message>,
    pub stream: bool,
}

impl PipeRequest {
    pub fn new(name: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            name: name.into(),
            messages,
            stream: false,
        }
    }
}

/// Reply of a pipe run. Only `completion` carries the generated text.
#[derive(Debug, Clone, Deserialize)]
pub struct PipeResponse {
    pub success: bool,
    pub completion: String,
    #[serde(rename = "threadId")]
    pub thread_id: Option<String>,
    pub raw: Option<RawResponse>,
}

impl PipeResponse {
    /// Tokens billed for the run, when the provider reported them.
    pub fn total_tokens(&self) -> Option<u32> {
        self.raw.as_ref()?.usage.as_ref()?.total_tokens
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawResponse {
    pub model: Option<String>,
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Usage {
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub total_tokens: Option<u32>,
}

/// Body of `POST /v1/pipes`, sent with `upsert` so start-up is repeatable.
#[derive(Debug, Clone, Serialize)]
pub struct CreatePipeRequest {
    pub name: String,
    pub description: String,
    pub model: String,
    pub upsert: bool,
    pub stream: bool,
    pub temperature: f64,
    pub max_tokens: u32,
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePipeResponse {
    pub name: String,
    pub status: String,
    pub url: String,
}

/// Static definition of a pipe this server depends on.
#[derive(Debug, Clone, PartialEq)]
pub struct PipeSpec {
    pub name: String,
    pub description: &'static str,
    pub system_prompt: &'static str,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl PipeSpec {
    pub fn to_create_request(&self, model: &str) -> CreatePipeRequest {
        CreatePipeRequest {
            name: self.name.clone(),
            description: self.description.to_string(),
            model: model.to_string(),
            upsert: true,
            stream: false,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            messages: vec![Message::system(self.system_prompt)],
        }
    }
}
