//! Chat through the policy engine, single-shot or interactive.

use std::io::Write;
use std::path::PathBuf;

use lethe_core::{ChatRequest, ChatResponse, ChatTurn};
use lethe_engine::ItemId;
use tracing::info;

use super::config::parse_policy_field;
use super::info::print_policy;
use crate::components::Components;
use crate::ingest::{ingest_files, print_reports};

/// Input parameters for the Chat command strategy.
#[derive(Debug, Clone)]
pub struct ChatInput {
    /// Single message to send (non-interactive mode)
    pub message: Option<String>,
    /// Documents to forget before the first message
    pub forget: Vec<PathBuf>,
    /// Print the request trace
    pub logs: bool,
    /// Print responses as JSON
    pub json: bool,
    /// Optional model override
    pub model: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct ChatStrategy;

impl super::CommandStrategy for ChatStrategy {
    type Input = ChatInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let components = Components::load(input.model)?;
        print_reports(&ingest_files(&components.engine, &input.forget).await);

        let output = Output {
            logs: input.logs,
            json: input.json,
        };

        if let Some(message) = input.message {
            let request = ChatRequest::new(message).with_logs(input.logs);
            let response = components.engine.chat(&request).await;
            output.print(&response)?;
        } else {
            run_interactive(&components, output).await?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct Output {
    logs: bool,
    json: bool,
}

impl Output {
    fn print(self, response: &ChatResponse) -> anyhow::Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(response)?);
            return Ok(());
        }
        println!("\n{}\n", response.response);
        if self.logs {
            for log in response.debug_logs.iter().flatten() {
                println!(
                    "  [{}] {:?}: {}",
                    log.timestamp.format("%H:%M:%S%.3f"),
                    log.severity,
                    log.message
                );
            }
            println!();
        }
        Ok(())
    }
}

async fn run_interactive(components: &Components, output: Output) -> anyhow::Result<()> {
    let engine = &components.engine;
    let mut history: Vec<ChatTurn> = Vec::new();

    println!("=== lethe chat ===");
    println!("Commands: /forget <file>, /list, /remove <id>, /config [field value], exit\n");

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if std::io::stdin().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();

        if matches!(line, "exit" | "quit" | "q") {
            break;
        }
        if line.is_empty() {
            continue;
        }

        if let Some(command) = line.strip_prefix('/') {
            if let Err(e) = run_command(components, command).await {
                eprintln!("Error: {e:#}");
            }
            continue;
        }

        let request = ChatRequest::new(line)
            .with_history(history.clone())
            .with_logs(output.logs);
        let response = engine.chat(&request).await;
        output.print(&response)?;

        history.push(ChatTurn::user(line));
        history.push(ChatTurn::assistant(response.response));
    }

    info!("Chat ended after {} turns", history.len() / 2);
    Ok(())
}

async fn run_command(components: &Components, command: &str) -> anyhow::Result<()> {
    let engine = &components.engine;
    let mut parts = command.split_whitespace();
    let name = parts.next().unwrap_or_default();
    let args: Vec<&str> = parts.collect();

    match (name, args.as_slice()) {
        ("forget", [path]) => {
            print_reports(&ingest_files(engine, &[PathBuf::from(path)]).await);
        }
        ("list", []) => {
            let items = engine.items();
            if items.is_empty() {
                println!("Nothing forgotten yet.");
            }
            for item in items {
                println!(
                    "  [{}] {} ({} statements)",
                    item.id,
                    item.source_name,
                    item.statements.len()
                );
            }
        }
        ("remove", [id]) => {
            let id: u64 = id.parse()?;
            let removed = engine.remove(ItemId(id)).await?;
            println!("Removed {} ({})", removed.id, removed.source_name);
        }
        ("config", []) => print_policy(&engine.config()),
        ("config", [field, value]) => {
            let update = parse_policy_field(field, value)?;
            let next = engine.update_config(&update, components.persist_policy())?;
            print_policy(&next);
        }
        _ => anyhow::bail!("unknown command '/{command}'"),
    }
    Ok(())
}
