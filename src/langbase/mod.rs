//! Langbase pipe client: the external text generator behind analysis turns
//! and diagram generation.

mod client;
mod types;

pub use client::{LangbaseClient, DEFAULT_MODEL};
pub use types::{
    CreatePipeRequest, CreatePipeResponse, Message, MessageRole, PipeRequest, PipeResponse,
    PipeSpec, RawResponse, Usage,
};

use crate::config::PipeConfig;
use crate::prompts::{
    ANALYSIS_PROMPT, DIAGRAM_ENHANCE_PROMPT, DIAGRAM_PROMPT, PERSPECTIVES_PROMPT,
};

/// Definitions of every pipe the server calls, named from configuration.
pub fn pipe_specs(pipes: &PipeConfig) -> Vec<PipeSpec> {
    vec![
        PipeSpec {
            name: pipes.perspectives.clone(),
            description: "Discovers scenario-specific analytical perspectives",
            system_prompt: PERSPECTIVES_PROMPT,
            temperature: 0.4,
            max_tokens: 400,
        },
        PipeSpec {
            name: pipes.analysis.clone(),
            description: "Multi-perspective plain-text analysis",
            system_prompt: ANALYSIS_PROMPT,
            temperature: 0.7,
            max_tokens: 6000,
        },
        PipeSpec {
            name: pipes.diagram.clone(),
            description: "Generates Mermaid argument diagrams",
            system_prompt: DIAGRAM_PROMPT,
            temperature: 0.3,
            max_tokens: 3000,
        },
        PipeSpec {
            name: pipes.diagram_enhance.clone(),
            description: "Expands or simplifies an existing Mermaid diagram",
            system_prompt: DIAGRAM_ENHANCE_PROMPT,
            temperature: 0.3,
            max_tokens: 3000,
        },
    ]
}
