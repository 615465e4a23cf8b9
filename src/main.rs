use std::io::Write;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use ollama_chat::constants::{
    DEFAULT_LOG_FILE, DEFAULT_MODEL, DEFAULT_OLLAMA_URL, DEFAULT_PORT, DEFAULT_TIMEOUT_SECS,
    NO_LOGS_MESSAGE, RECENT_LOG_LINES,
};
use ollama_chat::web_server::{self, WebConfig};
use ollama_chat::{ChatService, ChatSession, LogSink, OllamaClient, TurnOutcome};

// Define the command-line interface structure using clap
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

// Options shared by every command that talks to the model
#[derive(clap::Args, Debug)]
struct ModelArgs {
    #[arg(long, env = "OLLAMA_URL", default_value = DEFAULT_OLLAMA_URL, help = "Base URL of the Ollama server.")]
    ollama_url: String,
    #[arg(long, env = "CHAT_MODEL", default_value = DEFAULT_MODEL, help = "Model to chat with.")]
    model: String,
    #[arg(long, env = "CHAT_LOG_FILE", default_value = DEFAULT_LOG_FILE, help = "File receiving one log line per turn.")]
    log_file: PathBuf,
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS, help = "Timeout for a single model call, in seconds.")]
    timeout_secs: u64,
    #[arg(long, help = "Send the whole conversation instead of only the latest message.")]
    send_history: bool,
}

impl ModelArgs {
    fn build_service(&self) -> Result<ChatService> {
        let client = OllamaClient::new(&self.ollama_url, Duration::from_secs(self.timeout_secs))
            .context("Failed to initialize Ollama client")?;
        Ok(ChatService::new(client, LogSink::new(&self.log_file), &self.model)
            .with_history(self.send_history))
    }
}

// Define the available subcommands
#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Start the chat web server.
    Serve {
        #[command(flatten)]
        model: ModelArgs,
        #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST), help = "Address to bind.")]
        host: IpAddr,
        #[arg(long, default_value_t = DEFAULT_PORT, help = "Port for the web server.")]
        port: u16,
        #[arg(long, default_value = "templates", help = "Directory holding the page templates.")]
        templates: PathBuf,
        #[arg(long, default_value = "static", help = "Directory served under /static.")]
        static_dir: PathBuf,
        #[arg(long, default_value = "Ollama Chatbot", help = "Page title.")]
        title: String,
    },
    /// Engage in a text-based chat session in the terminal.
    Chat {
        #[command(flatten)]
        model: ModelArgs,
    },
    /// Print the most recent log lines.
    Logs {
        #[arg(long, env = "CHAT_LOG_FILE", default_value = DEFAULT_LOG_FILE, help = "Log file to read.")]
        log_file: PathBuf,
        #[arg(long, default_value_t = RECENT_LOG_LINES, help = "Number of lines to show.")]
        count: usize,
    },
}

async fn run_terminal_chat(service: ChatService) -> Result<()> {
    let mut session = ChatSession::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("Chatting with {} (Ctrl-D to quit)", service.model());
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        let outcome = service
            .submit(&mut session, &line)
            .await
            .context(format!("Failed to write chat log {}", service.sink().path().display()))?;
        match outcome {
            TurnOutcome::Reply(reply) => println!("{}", reply),
            TurnOutcome::Failed(message) => eprintln!("{}", message),
        }
    }
    Ok(())
}

fn print_logs(log_file: PathBuf, count: usize) -> Result<()> {
    let sink = LogSink::new(log_file);
    let lines = sink
        .recent(count)
        .context(format!("Failed to read {}", sink.path().display()))?;
    match lines {
        Some(lines) => lines.iter().for_each(|line| println!("{}", line)),
        None => println!("{}", NO_LOGS_MESSAGE),
    }
    Ok(())
}

// The main entry point of the application, using tokio's async runtime
#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (for OLLAMA_URL, CHAT_MODEL, ...)
    dotenvy::dotenv().ok();

    // Reads log level from RUST_LOG (e.g., RUST_LOG=info,ollama_chat=debug).
    // Diagnostics go to stderr so the terminal chat keeps stdout.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            model,
            host,
            port,
            templates,
            static_dir,
            title,
        } => {
            info!(model = %model.model, ollama = %model.ollama_url, "Starting chat web server");
            let service = model.build_service()?;
            let config = WebConfig {
                addr: SocketAddr::new(host, port),
                templates_dir: templates,
                static_dir,
                title,
            };
            web_server::start_web_server(config, service).await?;
            info!("Shutdown complete.");
        }
        Commands::Chat { model } => {
            info!(model = %model.model, "Starting terminal chat");
            run_terminal_chat(model.build_service()?).await?;
        }
        Commands::Logs { log_file, count } => print_logs(log_file, count)?,
    }

    Ok(())
}
