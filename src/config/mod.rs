use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::AppError;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub langbase: LangbaseConfig,
    pub logging: LoggingConfig,
    pub request: RequestConfig,
    pub pipes: PipeConfig,
    pub diagram: DiagramConfig,
    /// Optional JSON file replacing the built-in keyword rule table.
    pub rules_path: Option<PathBuf>,
}

/// Langbase API configuration
#[derive(Debug, Clone)]
pub struct LangbaseConfig {
    pub api_key: String,
    pub base_url: String,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// HTTP request configuration
#[derive(Debug, Clone)]
pub struct RequestConfig {
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

/// Langbase pipe name configuration
#[derive(Debug, Clone)]
pub struct PipeConfig {
    pub perspectives: String,
    pub analysis: String,
    pub diagram: String,
    pub diagram_enhance: String,
}

/// Diagram controller configuration
#[derive(Debug, Clone)]
pub struct DiagramConfig {
    /// Upper bound for a single generation or enhancement request.
    pub timeout_ms: u64,
    pub min_level: i32,
    pub max_level: i32,
    /// Identifiers a single generation prompt may name (at most 26).
    pub max_node_ids: usize,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, AppError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let langbase = LangbaseConfig {
            api_key: env::var("LANGBASE_API_KEY").map_err(|_| AppError::Config {
                message: "LANGBASE_API_KEY is required".to_string(),
            })?,
            base_url: env::var("LANGBASE_BASE_URL")
                .unwrap_or_else(|_| "https://api.langbase.com".to_string()),
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .to_lowercase()
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        };

        let request_defaults = RequestConfig::default();
        let request = RequestConfig {
            timeout_ms: parse_var("REQUEST_TIMEOUT_MS").unwrap_or(request_defaults.timeout_ms),
            max_retries: parse_var("MAX_RETRIES").unwrap_or(request_defaults.max_retries),
            retry_delay_ms: parse_var("RETRY_DELAY_MS")
                .unwrap_or(request_defaults.retry_delay_ms),
        };

        let pipe_defaults = PipeConfig::default();
        let pipes = PipeConfig {
            perspectives: env::var("PIPE_PERSPECTIVES").unwrap_or(pipe_defaults.perspectives),
            analysis: env::var("PIPE_ANALYSIS").unwrap_or(pipe_defaults.analysis),
            diagram: env::var("PIPE_DIAGRAM").unwrap_or(pipe_defaults.diagram),
            diagram_enhance: env::var("PIPE_DIAGRAM_ENHANCE")
                .unwrap_or(pipe_defaults.diagram_enhance),
        };

        let diagram_defaults = DiagramConfig::default();
        let diagram = DiagramConfig {
            timeout_ms: parse_var("DIAGRAM_TIMEOUT_MS").unwrap_or(diagram_defaults.timeout_ms),
            min_level: parse_var("DIAGRAM_MIN_LEVEL").unwrap_or(diagram_defaults.min_level),
            max_level: parse_var("DIAGRAM_MAX_LEVEL").unwrap_or(diagram_defaults.max_level),
            max_node_ids: parse_var::<usize>("DIAGRAM_MAX_NODE_IDS")
                .unwrap_or(diagram_defaults.max_node_ids)
                .clamp(1, 26),
        };

        if diagram.min_level > 0 || diagram.max_level < 0 {
            return Err(AppError::Config {
                message: format!(
                    "diagram level bounds [{}, {}] must include level 0",
                    diagram.min_level, diagram.max_level
                ),
            });
        }

        let rules_path = env::var("RULES_PATH")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        Ok(Config {
            langbase,
            logging,
            request,
            pipes,
            diagram,
            rules_path,
        })
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|s| s.trim().parse().ok())
}

impl DiagramConfig {
    /// Generation timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30000,
            max_retries: 3,
            retry_delay_ms: 1000,
        }
    }
}

impl Default for PipeConfig {
    fn default() -> Self {
        Self {
            perspectives: "analysis-perspectives-v1".to_string(),
            analysis: "multi-perspective-analysis-v1".to_string(),
            diagram: "argument-diagram-v1".to_string(),
            diagram_enhance: "argument-diagram-enhance-v1".to_string(),
        }
    }
}

impl Default for DiagramConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 45000,
            min_level: -2,
            max_level: 10,
            max_node_ids: 15,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}
