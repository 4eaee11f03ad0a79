use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use orderbot_agent::{build_llm_client, is_exit_command, AgentRuntime, RuntimeOptions};
use orderbot_core::backend::InMemoryOrderBackend;
use orderbot_core::config::{AppConfig, ConfigOverrides, LlmProvider, LoadOptions};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::info;

use super::CommandResult;

pub const BANNER: &str =
    "Orderbot chat session started.\nType 'quit' or 'exit' to end the session.\n";
pub const PROMPT: &str = "\nYou: ";
pub const FAREWELL: &str = "Goodbye!";

#[derive(Debug, Clone, Default)]
pub struct ChatOptions {
    pub config: Option<PathBuf>,
    pub provider: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub turns: usize,
}

pub fn run(options: ChatOptions) -> CommandResult {
    let provider = match options.provider.as_deref().map(str::parse::<LlmProvider>).transpose() {
        Ok(provider) => provider,
        Err(error) => return CommandResult::failure("chat", "invalid_argument", error.to_string(), 2),
    };

    let load_options = LoadOptions {
        require_file: options.config.is_some(),
        config_path: options.config,
        overrides: ConfigOverrides {
            llm_provider: provider,
            llm_model: options.model,
            ..ConfigOverrides::default()
        },
    };

    let config = match AppConfig::load(load_options) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure("chat", "config_validation", error.to_string(), 2)
        }
    };
    crate::init_logging(&config);

    match start_session(&config) {
        Ok(_) => CommandResult::silent(),
        Err(error) => CommandResult::failure("chat", "session", format!("{error:#}"), 1),
    }
}

fn start_session(config: &AppConfig) -> Result<SessionSummary> {
    let llm = build_llm_client(&config.llm).context("failed to build the model client")?;
    let backend = Arc::new(InMemoryOrderBackend::with_demo_orders());
    let mut runtime = AgentRuntime::new(llm, backend, RuntimeOptions::from_config(config));

    info!(
        event_name = "cli.chat.session_started",
        correlation_id = %runtime.session_id(),
        provider = ?config.llm.provider,
        model = %config.llm.model,
        "chat session started"
    );

    let executor = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to initialize async runtime")?;

    executor.block_on(async {
        let stdin = BufReader::new(tokio::io::stdin());
        let mut stdout = tokio::io::stdout();

        tokio::select! {
            summary = run_session(&mut runtime, stdin, &mut stdout) => {
                summary.context("chat session i/o failed")
            }
            _ = tokio::signal::ctrl_c() => {
                let mut interrupted = tokio::io::stdout();
                let _ = interrupted.write_all(format!("\n{FAREWELL}\n").as_bytes()).await;
                let _ = interrupted.flush().await;
                Ok(SessionSummary::default())
            }
        }
    })
}

/// Drives the read-plan-reply loop until an exit command or end of input.
pub async fn run_session<R, W>(
    runtime: &mut AgentRuntime,
    reader: R,
    writer: &mut W,
) -> std::io::Result<SessionSummary>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut summary = SessionSummary::default();
    let mut lines = reader.lines();

    writer.write_all(BANNER.as_bytes()).await?;
    loop {
        writer.write_all(PROMPT.as_bytes()).await?;
        writer.flush().await?;

        let Some(line) = lines.next_line().await? else {
            writer.write_all(b"\n").await?;
            break;
        };
        if is_exit_command(&line) {
            break;
        }

        let query = line.trim();
        if query.is_empty() {
            continue;
        }

        let report = runtime.handle_turn(query).await;
        summary.turns += 1;
        writer.write_all(format!("Assistant: {}\n", report.reply).as_bytes()).await?;
    }

    writer.write_all(format!("{FAREWELL}\n").as_bytes()).await?;
    writer.flush().await?;
    Ok(summary)
}
