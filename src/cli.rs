//! Offline commands that run without a Langbase connection.

use std::path::{Path, PathBuf};

use clap::Subcommand;

use crate::argument::{ArgumentExtractor, KeywordRuleTable};
use crate::diagram::validate;
use crate::error::AppResult;

/// Binary subcommands. Without one the server is started.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Serve MCP requests over stdio
    Serve,

    /// Print the argument tree of a text file as JSON (`null` when unstructured)
    Extract {
        /// Path to the analysis text
        #[arg(long)]
        file: PathBuf,

        /// Keyword rule table replacing the built-in one (default: `RULES_PATH`)
        #[arg(long)]
        rules: Option<PathBuf>,
    },

    /// Print the validation report of a diagram DSL file
    Validate {
        /// Path to the diagram text
        #[arg(long)]
        file: PathBuf,
    },
}

/// Result of CLI command execution.
#[derive(Debug)]
pub struct CliResult {
    /// Exit code (0 = success)
    pub exit_code: i32,
    pub message: String,
}

impl CliResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            exit_code: 1,
            message: message.into(),
        }
    }
}

/// Load the rule table at `path`, or the built-in one.
pub fn load_rules(path: Option<&Path>) -> AppResult<KeywordRuleTable> {
    match path {
        Some(path) => KeywordRuleTable::from_path(path),
        None => Ok(KeywordRuleTable::default()),
    }
}

/// Extract a file's argument tree.
///
/// An unstructured file is not an error: it prints `null` and exits 0.
pub fn execute_extract(file: &Path, rules: Option<&Path>) -> CliResult {
    let rules = match load_rules(rules) {
        Ok(rules) => rules,
        Err(e) => return CliResult::error(e.to_string()),
    };
    let text = match std::fs::read_to_string(file) {
        Ok(text) => text,
        Err(e) => return CliResult::error(format!("Cannot read {}: {}", file.display(), e)),
    };

    let tree = ArgumentExtractor::new(rules).extract(&text);
    match serde_json::to_string_pretty(&tree) {
        Ok(json) => CliResult::success(json),
        Err(e) => CliResult::error(format!("Failed to serialize tree: {}", e)),
    }
}

/// Validate a diagram file. Exits 1 when the diagram is rejected.
pub fn execute_validate(file: &Path) -> CliResult {
    let dsl = match std::fs::read_to_string(file) {
        Ok(dsl) => dsl,
        Err(e) => return CliResult::error(format!("Cannot read {}: {}", file.display(), e)),
    };

    let report = validate(&dsl);
    let valid = report.valid;
    match serde_json::to_string_pretty(&report) {
        Ok(json) if valid => CliResult::success(json),
        Ok(json) => CliResult::error(json),
        Err(e) => CliResult::error(format!("Failed to serialize report: {}", e)),
    }
}
