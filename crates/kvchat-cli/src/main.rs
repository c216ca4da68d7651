//! kvchat CLI - chat with a local model, one line per turn.

use clap::Parser;
use kvchat_core::{SessionConfig, SessionConfigBuilder};
use std::io;
use std::path::PathBuf;

mod chat;
mod terminal;

/// kvchat - incremental chat with a local GGUF model
#[derive(Parser, Debug)]
#[command(name = "kvchat")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the GGUF model
    #[arg(short, long, env = "KVCHAT_MODEL")]
    model: PathBuf,

    /// Run a single turn with this prompt and exit
    #[arg(short, long)]
    prompt: Option<String>,

    /// Context window size in tokens (default: 2048)
    #[arg(short = 'c', long = "ctx")]
    ctx: Option<u32>,

    /// Batch size in tokens (default: context window size)
    #[arg(short, long)]
    batch: Option<u32>,

    /// Number of threads (default: 4)
    #[arg(short, long)]
    threads: Option<u32>,

    /// Maximum tokens generated per turn (default: until the window is full)
    #[arg(short = 'n', long = "n-predict")]
    n_predict: Option<usize>,

    /// Bytes of each reply kept in the transcript (default: 4096)
    #[arg(long)]
    response_capacity: Option<usize>,

    /// End the session on the first failed turn
    #[arg(long)]
    fail_fast: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// Environment configuration with command-line overrides applied.
    fn session_config(&self) -> SessionConfig {
        let mut builder = SessionConfigBuilder::from_config(SessionConfig::from_env());
        if let Some(n_ctx) = self.ctx {
            builder = builder.window_capacity(n_ctx);
        }
        if let Some(threads) = self.threads {
            builder = builder.thread_count(threads);
        }
        if let Some(bytes) = self.response_capacity {
            builder = builder.response_capacity(bytes);
        }
        if self.n_predict.is_some() {
            builder = builder.max_new_tokens(self.n_predict);
        }
        if self.fail_fast {
            builder = builder.recover_turn_errors(false);
        }

        let mut config = builder.build();
        // Batch follows the window unless set explicitly.
        match self.batch {
            Some(n_batch) => config.context.batch_size = n_batch,
            None if self.ctx.is_some() && std::env::var_os("KVCHAT_BATCH").is_none() => {
                config.context.batch_size = config.context.window_capacity;
            }
            None => {}
        }
        config
    }
}

fn main() -> miette::Result<()> {
    let cli = Cli::parse();

    // Set up logging on stderr, stdout carries the chat
    let filter = if cli.verbose { "debug" } else { "warn" };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .with_writer(io::stderr)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();

    let config = cli.session_config();
    config
        .validate()
        .map_err(|e| miette::miette!("Invalid configuration: {}", e))?;

    let mut lines = terminal::PromptedLines::new(io::stdin().lock(), io::stdout());
    let mut out = terminal::Green::new(io::stdout());

    chat::run(
        &cli.model,
        cli.prompt.as_deref(),
        config,
        cli.verbose,
        &mut lines,
        &mut out,
    )
}
