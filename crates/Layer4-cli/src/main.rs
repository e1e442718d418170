//! MaumTalk CLI - Main entry point

mod cli;

use clap::{Parser, Subcommand};
use maum_foundation::Priority;

/// MaumTalk - emotion-aware AI companion chat engine
#[derive(Parser, Debug)]
#[command(name = "maum")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Send a single message without a subcommand
    #[arg(short, long)]
    message: Option<String>,

    /// Preferred provider (anthropic, openai, local)
    #[arg(long)]
    provider: Option<String>,

    /// Queue priority (high, normal, low)
    #[arg(long, default_value = "normal")]
    priority: String,

    /// Companion display name
    #[arg(long, default_value = "하루")]
    name: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Send one chat message through the engine
    Chat {
        /// The message to send
        message: String,

        /// Preferred provider for this message
        #[arg(long)]
        provider: Option<String>,

        /// Queue priority (high, normal, low)
        #[arg(long, default_value = "normal")]
        priority: String,
    },
    /// Check every provider's health
    Health,
    /// Show usage statistics for a fresh engine instance
    Stats,
}

fn parse_priority(raw: &str) -> Priority {
    match raw.to_ascii_lowercase().as_str() {
        "high" => Priority::High,
        "low" => Priority::Low,
        _ => Priority::Normal,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = if args.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match args.command {
        Some(Command::Chat {
            message,
            provider,
            priority,
        }) => {
            cli::run_chat(&message, &args.name, provider, parse_priority(&priority)).await?;
        }
        Some(Command::Health) => {
            cli::run_health().await?;
        }
        Some(Command::Stats) => {
            cli::run_stats().await?;
        }
        None => match args.message {
            Some(message) => {
                cli::run_chat(
                    &message,
                    &args.name,
                    args.provider,
                    parse_priority(&args.priority),
                )
                .await?;
            }
            None => {
                eprintln!("사용법: maum chat <메시지>  (또는 maum -m <메시지>)");
                eprintln!("        maum health | maum stats");
            }
        },
    }

    Ok(())
}
