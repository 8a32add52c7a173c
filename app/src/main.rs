#![deny(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use lethe_core::PolicyUpdate;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod command;
mod components;
mod ingest;

use command::{
    ChatInput, ChatStrategy, CheckInput, CheckStrategy, CommandStrategy, ConfigInput,
    ConfigStrategy, InfoStrategy, InitStrategy, VersionStrategy,
};

#[derive(Parser)]
#[command(name = "lethe")]
#[command(about = "Keeps a local model from disclosing what it was told to forget", long_about = None)]
struct Cli {
    /// Log at debug level (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize configuration
    Init,
    /// Show version
    Version,
    /// Show effective configuration
    Info,
    /// Show or update the policy configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Score text against the forgetting set
    Check {
        /// Text to score
        text: String,

        /// Documents to forget before scoring (.txt or .md)
        #[arg(short = 'f', long = "forget", value_name = "FILE")]
        forget: Vec<PathBuf>,
    },
    /// Chat through the policy engine
    Chat {
        /// Single message to send
        #[arg(short = 'm', long)]
        message: Option<String>,

        /// Documents to forget before chatting (.txt or .md)
        #[arg(short = 'f', long = "forget", value_name = "FILE")]
        forget: Vec<PathBuf>,

        /// Print the request trace after each response
        #[arg(long)]
        logs: bool,

        /// Print responses as JSON
        #[arg(long)]
        json: bool,

        /// Model to use
        #[arg(short = 'M', long)]
        model: Option<String>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the policy configuration
    Show,
    /// Update and persist policy fields
    Set(SetArgs),
}

#[derive(Args)]
struct SetArgs {
    #[arg(long, value_name = "BOOL")]
    retain_mode: Option<bool>,

    #[arg(long, value_name = "BOOL")]
    check_before_llm: Option<bool>,

    /// Similarity threshold in [0, 1]
    #[arg(long, value_name = "FLOAT")]
    threshold: Option<f64>,

    #[arg(long, value_name = "BOOL")]
    use_entities: Option<bool>,

    #[arg(long, value_name = "NAME")]
    model: Option<String>,
}

impl From<SetArgs> for PolicyUpdate {
    fn from(args: SetArgs) -> Self {
        Self {
            retain_mode: args.retain_mode,
            check_before_llm: args.check_before_llm,
            similarity_threshold: args.threshold,
            use_entities: args.use_entities,
            model_name: args.model,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Init => InitStrategy.execute(()).await,
        Commands::Version => VersionStrategy.execute(()).await,
        Commands::Info => InfoStrategy.execute(()).await,
        Commands::Config { action } => {
            let input = match action {
                ConfigAction::Show => ConfigInput::Show,
                ConfigAction::Set(args) => ConfigInput::Set(args.into()),
            };
            ConfigStrategy.execute(input).await
        }
        Commands::Check { text, forget } => CheckStrategy.execute(CheckInput { text, forget }).await,
        Commands::Chat {
            message,
            forget,
            logs,
            json,
            model,
        } => {
            ChatStrategy
                .execute(ChatInput {
                    message,
                    forget,
                    logs,
                    json,
                    model,
                })
                .await
        }
    }
}
