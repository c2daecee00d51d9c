use std::io::Write;
use std::sync::Arc;

use tokio::io::AsyncBufReadExt;

use deskhand::agent_engine::engine::AgentEngine;
use deskhand::config;
use deskhand::llm::providers::anthropic::AnthropicProvider;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Load .env if present (ignore error if not found).
    let _ = dotenvy::dotenv();

    let cfg = config::load_config_or_default();
    let provider = Arc::new(AnthropicProvider::from_config(&cfg.api)?);
    let mut engine = AgentEngine::new(&cfg, provider)?;
    tracing::info!(session = %engine.session_id(), "session started");

    println!("deskhand: type an instruction; empty line or Ctrl+D exits.");
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let line = tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
            line = lines.next_line() => line?,
        };
        let Some(line) = line else { break };
        let instruction = line.trim();
        if instruction.is_empty() {
            break;
        }

        let reply = tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!();
                println!("Interrupted.");
                break;
            }
            reply = engine.run_instruction(instruction) => reply,
        };
        match reply {
            Ok(text) => println!("{text}"),
            Err(e) => {
                tracing::error!(error = %e, "instruction failed");
                println!("Stopping after error: {e}");
                break;
            }
        }
    }

    println!("Goodbye.");
    Ok(())
}
