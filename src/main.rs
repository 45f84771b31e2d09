//! # docchat CLI
//!
//! Command-line surface for the document chat core.
//!
//! ```bash
//! docchat --config ./config/docchat.toml <command>
//! ```
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docchat init` | Create the SQLite database and run schema migrations |
//! | `docchat upload <file>` | Upload a document, build its index, create a session |
//! | `docchat sessions` | List sessions, most recently used first |
//! | `docchat history <session-id>` | Print a session's chat history |
//! | `docchat ask <session-id> "<question>"` | Ask one question against a session |
//! | `docchat chat <session-id>` | Interactive chat loop for a session |

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use uuid::Uuid;

use docchat::chat::ChatManager;
use docchat::config::{load_config, Config};
use docchat::models::MessageRole;
use docchat::{db, migrate};

/// Document chat: ask questions about an uploaded file using local
/// Ollama models.
#[derive(Parser)]
#[command(
    name = "docchat",
    about = "Session-scoped retrieval-augmented chat over uploaded documents",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/docchat.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Idempotent.
    Init,

    /// Upload a document: copies it into the uploads directory, builds its
    /// vector index, and creates a chat session for it.
    Upload {
        /// Path to the file to upload (PDF, DOC/DOCX, or plain text).
        file: PathBuf,
    },

    /// List sessions, most recently accessed first.
    Sessions,

    /// Print a session's chat history in timestamp order.
    History {
        /// Session id as printed by `upload` or `sessions`.
        session_id: String,
    },

    /// Ask a single question against a session's document.
    Ask {
        session_id: String,
        question: String,
    },

    /// Interactive chat loop against a session's document. Exit with
    /// `quit` or end-of-input.
    Chat {
        session_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Init => run_init(&config).await,
        Commands::Upload { file } => run_upload(&config, &file).await,
        Commands::Sessions => run_sessions(&config).await,
        Commands::History { session_id } => run_history(&config, &session_id).await,
        Commands::Ask {
            session_id,
            question,
        } => run_ask(&config, &session_id, &question).await,
        Commands::Chat { session_id } => run_chat(&config, &session_id).await,
    }
}

async fn manager(config: &Config) -> Result<ChatManager> {
    let pool = db::connect(&config.db.path).await?;
    migrate::run_migrations(&pool).await?;
    Ok(ChatManager::new(config.clone(), pool)?)
}

async fn run_init(config: &Config) -> Result<()> {
    let pool = db::connect(&config.db.path).await?;
    migrate::run_migrations(&pool).await?;
    std::fs::create_dir_all(&config.uploads.dir)?;
    println!("initialized {}", config.db.path.display());
    Ok(())
}

/// Copy the file into the uploads directory under a fresh name, enforcing
/// the configured size limit, then create the session.
async fn run_upload(config: &Config, file: &Path) -> Result<()> {
    let metadata = std::fs::metadata(file)
        .with_context(|| format!("cannot read {}", file.display()))?;
    if metadata.len() > config.uploads.max_bytes {
        anyhow::bail!(
            "file exceeds upload limit ({} > {} bytes)",
            metadata.len(),
            config.uploads.max_bytes
        );
    }

    let filename = file
        .file_name()
        .and_then(|n| n.to_str())
        .context("file has no name")?
        .to_string();

    std::fs::create_dir_all(&config.uploads.dir)?;
    let stored_path = config
        .uploads
        .dir
        .join(format!("{}_{}", Uuid::new_v4(), filename));
    std::fs::copy(file, &stored_path)?;

    let mut manager = manager(config).await?;
    let session_id = manager
        .create_session(&filename, &stored_path.to_string_lossy())
        .await?;

    println!("session created: {session_id}");
    println!("  file: {filename}");
    println!("  stored: {}", stored_path.display());
    Ok(())
}

async fn run_sessions(config: &Config) -> Result<()> {
    let manager = manager(config).await?;
    let sessions = manager.list_sessions().await?;

    if sessions.is_empty() {
        println!("No sessions.");
        return Ok(());
    }

    for s in &sessions {
        println!("{}  {}", s.session_id, s.filename);
        println!("    created:       {}", format_ts(s.created_at));
        println!("    last accessed: {}", format_ts(s.last_accessed));
        println!("    messages:      {}", s.message_count);
    }
    Ok(())
}

async fn run_history(config: &Config, session_id: &str) -> Result<()> {
    let manager = manager(config).await?;
    let history = manager.get_history(session_id).await?;

    if history.is_empty() {
        println!("No messages.");
        return Ok(());
    }

    for m in &history {
        let prefix = match m.role {
            MessageRole::User => "you",
            MessageRole::Assistant => "assistant",
        };
        println!("[{}] {}: {}", format_ts(m.created_at), prefix, m.content);
    }
    Ok(())
}

async fn run_ask(config: &Config, session_id: &str, question: &str) -> Result<()> {
    let manager = manager(config).await?;
    let answer = manager.query(session_id, question).await?;
    println!("{answer}");
    Ok(())
}

async fn run_chat(config: &Config, session_id: &str) -> Result<()> {
    let mut manager = manager(config).await?;

    if !manager.load_session(session_id).await? {
        anyhow::bail!("unknown session: {session_id}");
    }

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();

    loop {
        print!("you> ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "quit" || line == "exit" {
            break;
        }

        let answer = manager.get_response(line).await?;
        println!("assistant> {answer}");
    }

    Ok(())
}

fn format_ts(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| ts.to_string())
}
