pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use orderbot_core::config::{AppConfig, LogFormat};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "orderbot",
    about = "Orderbot customer-service agent CLI",
    long_about = "Chat with the order-management agent, inspect configuration, and run readiness checks.",
    after_help = "Examples:\n  orderbot chat\n  orderbot chat --provider ollama --model llama3.1\n  orderbot doctor --json\n  orderbot orders"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Start an interactive chat session (type 'quit' or 'exit' to leave)")]
    Chat {
        #[arg(long, help = "Path to an orderbot.toml config file")]
        config: Option<PathBuf>,
        #[arg(long, help = "Model provider: gemini, openai or ollama")]
        provider: Option<String>,
        #[arg(long, help = "Model name to use for planning and replies")]
        model: Option<String>,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, model credential readiness, and the order backend")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "List the demo orders with their cancellation eligibility")]
    Orders,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Chat { config, provider, model } => {
            commands::chat::run(commands::chat::ChatOptions { config, provider, model })
        }
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => commands::doctor::run(json),
        Command::Orders => {
            commands::CommandResult { exit_code: 0, output: commands::orders::run() }
        }
    };

    if !result.output.is_empty() {
        println!("{}", result.output);
    }
    ExitCode::from(result.exit_code)
}

/// Logs go to stderr so the chat transcript on stdout stays clean.
pub fn init_logging(config: &AppConfig) {
    let filter = EnvFilter::try_new(config.logging.level.trim())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    // A subscriber may already be installed when commands run in-process.
    let _ = match config.logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}
