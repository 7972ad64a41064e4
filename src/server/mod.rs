//! Server module for MCP protocol handling.
//!
//! This module provides:
//! - MCP server implementation over stdio
//! - Tool call handlers and routing
//! - Shared application state management

mod handlers;
mod mcp;

pub use handlers::*;
pub use mcp::*;

use std::sync::Arc;

use crate::analysis::AnalysisMode;
use crate::argument::ArgumentExtractor;
use crate::config::Config;
use crate::diagram::{
    DiagramEnhancementController, DiagramGenerator, DiagramKind, DiagramSettings,
    LangbaseDiagramGenerator,
};
use crate::langbase::LangbaseClient;
use crate::session::SessionStore;

/// Application state shared across handlers.
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Langbase API client.
    pub langbase: Arc<LangbaseClient>,
    /// Live analysis sessions.
    pub sessions: Arc<SessionStore>,
    /// Argument extractor with the active rule table.
    pub extractor: ArgumentExtractor,
    /// Analysis turn handler.
    pub analysis: AnalysisMode,
    /// Diagram text producer shared by every session's controller.
    pub generator: Arc<dyn DiagramGenerator>,
    /// Level range, identifier capacity and timeout for diagram controllers.
    pub diagram_settings: DiagramSettings,
}

impl AppState {
    /// Create application state backed by Langbase pipes.
    pub fn new(config: Config, langbase: LangbaseClient, extractor: ArgumentExtractor) -> Self {
        let langbase = Arc::new(langbase);
        let generator: Arc<dyn DiagramGenerator> = Arc::new(LangbaseDiagramGenerator::new(
            Arc::clone(&langbase),
            config.pipes.diagram.clone(),
            config.pipes.diagram_enhance.clone(),
        ));
        Self::with_generator(config, langbase, extractor, generator)
    }

    /// Create application state with an explicit diagram generator.
    pub fn with_generator(
        config: Config,
        langbase: Arc<LangbaseClient>,
        extractor: ArgumentExtractor,
        generator: Arc<dyn DiagramGenerator>,
    ) -> Self {
        tracing::info!(
            analysis_pipe = %config.pipes.analysis,
            diagram_pipe = %config.pipes.diagram,
            min_level = config.diagram.min_level,
            max_level = config.diagram.max_level,
            "AppState initializing"
        );

        let sessions = Arc::new(SessionStore::new());
        let analysis = AnalysisMode::new(
            Arc::clone(&langbase),
            Arc::clone(&sessions),
            extractor.clone(),
            &config,
        );
        let diagram_settings = DiagramSettings::from(&config.diagram);

        Self {
            config,
            langbase,
            sessions,
            extractor,
            analysis,
            generator,
            diagram_settings,
        }
    }

    /// A fresh controller for `topic`, sharing this state's generator.
    pub fn new_controller(&self, topic: &str, kind: DiagramKind) -> DiagramEnhancementController {
        DiagramEnhancementController::new(
            Arc::clone(&self.generator),
            self.diagram_settings.clone(),
            topic,
            kind,
        )
    }
}

/// Shared application state handle
pub type SharedState = Arc<AppState>;
