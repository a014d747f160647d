//! Bid Chat Terminal
//!
//! Interactive driver for the dialogue engine: one line in, one reply out,
//! for a single session id.
//!
//! # Usage
//!
//! ```bash
//! # New session with the built-in schema, sessions under ./user_history
//! bidchat
//!
//! # Resume a session with a model and reference dataset
//! bidchat --session alice --model models/bid_model.yaml --dataset models/bids.csv
//!
//! # Configuration file (also read from BIDCHAT_CONFIG)
//! bidchat --config config/bidchat.yaml
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use bidchat::{ChatConfig, DialogueEngine};

#[derive(Parser)]
#[command(name = "bidchat")]
#[command(version)]
#[command(about = "Chat your way to a freelance bid prediction")]
struct Cli {
    /// YAML configuration file
    #[arg(long, short, env = "BIDCHAT_CONFIG")]
    config: Option<PathBuf>,

    /// Session id to start or resume (random if not given)
    #[arg(long, short)]
    session: Option<String>,

    /// Directory holding session records
    #[arg(long, env = "BIDCHAT_HISTORY_DIR")]
    history_dir: Option<PathBuf>,

    /// Keep the session in memory only
    #[arg(long)]
    in_memory: bool,

    /// Bid model file (YAML or JSON)
    #[arg(long, env = "BIDCHAT_MODEL")]
    model: Option<PathBuf>,

    /// Reference dataset (CSV) for suggestions
    #[arg(long, env = "BIDCHAT_DATASET")]
    dataset: Option<PathBuf>,

    /// Debug logging
    #[arg(long, short)]
    verbose: bool,
}

impl Cli {
    fn load_config(&self) -> Result<ChatConfig> {
        let mut config = ChatConfig::load_or_default(self.config.as_deref()).with_context(|| {
            format!(
                "Failed to load configuration{}",
                self.config
                    .as_ref()
                    .map(|p| format!(" from {}", p.display()))
                    .unwrap_or_default()
            )
        })?;

        if let Some(dir) = &self.history_dir {
            config.storage.history_dir = dir.clone();
        }
        if self.in_memory {
            config.storage.in_memory = true;
        }
        if let Some(model) = &self.model {
            config.model.model_path = Some(model.clone());
        }
        if let Some(dataset) = &self.dataset {
            config.model.dataset_path = Some(dataset.clone());
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();

    let config = cli.load_config()?;
    let engine = config
        .build_engine()
        .context("Invalid chat configuration")?;
    let session_id = cli
        .session
        .clone()
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    run(&engine, &session_id).await
}

async fn run(engine: &DialogueEngine, session_id: &str) -> Result<()> {
    println!("{} {}", "Session:".cyan().bold(), session_id);
    println!("{}", "Type 'quit' or 'exit' to leave.".dimmed());
    println!();
    println!("{}", engine.greeting());

    let mut rl = DefaultEditor::new().context("Failed to initialise line editor")?;

    loop {
        match rl.readline(&format!("{} ", ">".green().bold())) {
            Ok(line) => {
                let trimmed = line.trim();
                if matches!(trimmed.to_lowercase().as_str(), "quit" | "exit") {
                    break;
                }
                if !trimmed.is_empty() {
                    let _ = rl.add_history_entry(trimmed);
                }

                let reply = engine.respond(&line, session_id).await;
                println!();
                println!("{}", reply.text);
                println!();
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type 'quit' to exit.".yellow());
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("{}: {}", "error".red().bold(), err);
                break;
            }
        }
    }

    println!("{}", "Goodbye!".bright_green());
    Ok(())
}
