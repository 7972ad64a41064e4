use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use mcp_argument_mapper::{
    argument::ArgumentExtractor,
    cli::{execute_extract, execute_validate, load_rules, CliResult, Commands},
    config::{Config, LogFormat, LoggingConfig},
    langbase::{pipe_specs, LangbaseClient},
    server::{AppState, McpServer},
};

/// Argument extraction and diagram detail control over MCP.
#[derive(Parser, Debug)]
#[command(name = "mcp-argument-mapper", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve().await,
        Commands::Extract { file, rules } => {
            init_logging(&LoggingConfig::default());
            let rules = rules.or_else(|| std::env::var_os("RULES_PATH").map(PathBuf::from));
            finish(execute_extract(&file, rules.as_deref()))
        }
        Commands::Validate { file } => {
            init_logging(&LoggingConfig::default());
            finish(execute_validate(&file))
        }
    }
}

fn finish(result: CliResult) -> anyhow::Result<()> {
    if result.exit_code == 0 {
        println!("{}", result.message);
    } else {
        eprintln!("{}", result.message);
    }
    std::process::exit(result.exit_code);
}

async fn serve() -> anyhow::Result<()> {
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config.logging);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "MCP Argument Mapper starting..."
    );

    let rules = match load_rules(config.rules_path.as_deref()) {
        Ok(rules) => {
            if let Some(path) = &config.rules_path {
                info!(path = %path.display(), "Keyword rule table loaded");
            }
            rules
        }
        Err(e) => {
            error!(error = %e, "Failed to load keyword rule table");
            return Err(e.into());
        }
    };

    let langbase = match LangbaseClient::new(&config.langbase, config.request.clone()) {
        Ok(c) => {
            info!(base_url = %config.langbase.base_url, "Langbase client initialized");
            c
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize Langbase client");
            return Err(e.into());
        }
    };

    info!("Ensuring required Langbase pipes exist...");
    if let Err(e) = langbase.ensure_pipes(&pipe_specs(&config.pipes)).await {
        error!(error = %e, "Failed to ensure pipes exist");
        return Err(e.into());
    }

    let state = Arc::new(AppState::new(config, langbase, ArgumentExtractor::new(rules)));
    let server = McpServer::new(state);

    info!("Server ready, waiting for requests on stdin...");

    if let Err(e) = server.run().await {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing on stderr; stdout carries the protocol.
fn init_logging(logging: &LoggingConfig) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    match logging.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
