//! # MCP Argument Mapper
//!
//! A Model Context Protocol (MCP) server that turns multi-perspective analysis
//! text into structured argument trees and manages detail levels of generated
//! argument diagrams. Text generation is delegated to Langbase Pipes.
//!
//! ## Features
//!
//! - **Argument extraction**: sections, claims and supporting details as a typed tree
//! - **Multi-perspective analysis**: scenario-specific perspectives, follow-up turns
//! - **Diagram validation**: structural checks on generated diagram DSL
//! - **Detail levels**: cached expand/simplify steps around a base diagram
//! - **Deterministic rendering**: argument tree to diagram DSL without a model
//!
//! ## Architecture
//!
//! ```text
//! MCP Client → MCP Server (Rust) → Langbase Pipes (HTTP)
//!                    ↓
//!     ArgumentExtractor · DiagramEnhancementController (in memory)
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use mcp_argument_mapper::{AppState, Config, McpServer};
//! use mcp_argument_mapper::argument::ArgumentExtractor;
//! use mcp_argument_mapper::langbase::LangbaseClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let langbase = LangbaseClient::new(&config.langbase, config.request.clone())?;
//!     let state = Arc::new(AppState::new(config, langbase, ArgumentExtractor::default()));
//!     McpServer::new(state).run().await?;
//!     Ok(())
//! }
//! ```

/// Multi-perspective analysis turns.
pub mod analysis;
/// Argument-structure extraction from analysis text.
pub mod argument;
/// Offline command-line commands.
pub mod cli;
/// Configuration management for the MCP server.
pub mod config;
/// Diagram validation, rendering and detail-level control.
pub mod diagram;
/// Error types and result aliases for the application.
pub mod error;
/// Langbase API client and types for pipe communication.
pub mod langbase;
/// System prompts for Langbase pipes.
pub mod prompts;
/// MCP server implementation and request handling.
pub mod server;
/// In-memory analysis sessions.
pub mod session;

pub use argument::{parse_arguments, ArgumentExtractor, ArgumentTree};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use server::{AppState, McpServer, SharedState};
