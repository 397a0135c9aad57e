//! CRM Copilot CLI
//!
//! Runs the HTTP server, or drives the copilot from the terminal.

use anyhow::Result;
use clap::{Parser, Subcommand};
use crm_copilot::config::StoreBackend;
use crm_copilot::crm::HubspotClient;
use crm_copilot::store::{ConversationStore, MemoryConversationStore, SqliteConversationStore};
use crm_copilot::telemetry::record_event;
use crm_copilot::{AgentEvent, ChatModel, Config, Copilot, CopilotOptions, ProviderClient, Telemetry};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "crm-copilot")]
#[command(about = "CRM Copilot - multi-agent assistant for HubSpot", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// YAML config file (default: ./crm-copilot.yaml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// LLM model to use
    #[arg(short, long)]
    model: Option<String>,

    /// Base URL for the OpenAI-compatible LLM endpoint
    #[arg(long)]
    base_url: Option<String>,

    /// HTTP port for `serve`
    #[arg(short, long)]
    port: Option<u16>,

    /// OpenTelemetry collector endpoint (e.g., http://localhost:4318)
    #[arg(long)]
    otel_endpoint: Option<String>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server (default)
    Serve,

    /// Run a single query
    Prompt {
        /// The query to send
        query: String,

        /// Conversation to continue (default: a new one)
        #[arg(long)]
        conversation_id: Option<String>,
    },

    /// Start an interactive session on one conversation
    Repl {
        /// Conversation to continue (default: a new one)
        #[arg(long)]
        conversation_id: Option<String>,
    },

    /// Show where a query would be routed
    Route {
        /// The query to route
        query: String,
    },
}

/// Merge command-line flags over the loaded configuration
fn build_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load(cli.config.as_deref())?.with_verbose(cli.verbose);
    if let Some(model) = &cli.model {
        config.llm.model = Some(model.clone());
    }
    if let Some(base_url) = &cli.base_url {
        config.llm.base_url = Some(base_url.clone());
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(endpoint) = &cli.otel_endpoint {
        config.telemetry.otel_endpoint = Some(endpoint.clone());
    }
    Ok(config)
}

fn open_store(config: &Config) -> Result<Arc<dyn ConversationStore>> {
    Ok(match config.store.backend {
        StoreBackend::Memory => Arc::new(MemoryConversationStore::new()),
        StoreBackend::Sqlite => Arc::new(SqliteConversationStore::open(&config.store.path)?),
    })
}

fn build_copilot(config: &Config, events: Option<mpsc::UnboundedSender<AgentEvent>>) -> Result<Copilot> {
    let provider = config.provider_config()?;
    tracing::info!(provider = %provider.name, model = %provider.default_model, "using model");
    let model: Arc<dyn ChatModel> = Arc::new(ProviderClient::new(provider)?);
    let crm = Arc::new(HubspotClient::from_env(&config.crm.api_key_env, &config.crm.base_url)?);
    let store = open_store(config)?;

    let options = CopilotOptions {
        max_rounds: config.agent.max_rounds,
        request_timeout: config.request_timeout(),
        events,
    };
    Ok(Copilot::new(model, crm, store, options)?)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = build_config(&cli)?;

    // the server writes structured logs to disk; terminal commands only need stderr
    let telemetry = match cli.command {
        Some(Commands::Serve) | None => Telemetry::init(&config.telemetry)?,
        _ => Telemetry::minimal(config.telemetry.verbose),
    };

    let result = match cli.command {
        Some(Commands::Prompt { query, conversation_id }) => {
            run_single_prompt(&config, &query, conversation_id).await
        }
        Some(Commands::Repl { conversation_id }) => run_repl(&config, conversation_id).await,
        Some(Commands::Route { query }) => run_route(&config, &query).await,
        Some(Commands::Serve) | None => run_server(&config).await,
    };

    telemetry.shutdown();
    result
}

async fn run_server(config: &Config) -> Result<()> {
    let copilot = Arc::new(build_copilot(config, None)?);

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown requested");
        }
        signal.cancel();
    });

    crm_copilot::server::serve(copilot, &config.bind_addr(), shutdown).await
}

async fn run_single_prompt(config: &Config, query: &str, conversation_id: Option<String>) -> Result<()> {
    let copilot = build_copilot(config, None)?;
    let conversation_id = conversation_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let reply = copilot.handle(query, &conversation_id).await?;
    println!("{}", reply.text());
    eprintln!("---\nconversation: {}", conversation_id);
    Ok(())
}

async fn run_route(config: &Config, query: &str) -> Result<()> {
    let copilot = build_copilot(config, None)?;
    let decision = copilot.route(query).await?;

    println!("destination: {}", decision.resolve());
    println!("raw:         {}", decision.raw);
    println!("source:      {:?}", decision.source);
    if decision.destination().is_none() {
        println!("(not a known agent; the CRM agent handles it)");
    }
    Ok(())
}

/// Print tool activity as it happens and mirror it into the log
fn spawn_event_printer(mut rx: mpsc::UnboundedReceiver<AgentEvent>) {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            record_event(&event);
            match &event {
                AgentEvent::ToolCallStart { agent, tool, arguments, .. } => {
                    println!("  [{}] {} {}", agent, tool, arguments);
                }
                AgentEvent::ToolCallEnd {
                    tool,
                    is_error: true,
                    output,
                    ..
                } => {
                    println!("  [{}] failed: {}", tool, output);
                }
                _ => {}
            }
        }
    });
}

fn print_help() {
    println!("Commands:");
    println!("  /quit, /exit  - Exit the REPL");
    println!("  /new          - Start a new conversation");
    println!("  /id           - Show the conversation id");
    println!("  /help         - Show this help");
}

async fn run_repl(config: &Config, conversation_id: Option<String>) -> Result<()> {
    let (tx, rx) = mpsc::unbounded_channel();
    let copilot = build_copilot(config, Some(tx))?;
    spawn_event_printer(rx);

    let mut conversation_id = conversation_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    println!("CRM Copilot REPL");
    println!("Conversation: {}", conversation_id);
    println!();
    print_help();
    println!();

    let mut rl = DefaultEditor::new()?;
    let history_path = dirs::data_dir()
        .map(|d| d.join("crm-copilot"))
        .unwrap_or_else(|| PathBuf::from(".crm_copilot"))
        .join("history.txt");
    let _ = rl.load_history(&history_path);

    loop {
        match rl.readline("crm-copilot> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                rl.add_history_entry(line)?;

                match line {
                    "/quit" | "/exit" => {
                        println!("Goodbye!");
                        break;
                    }
                    "/new" => {
                        conversation_id = uuid::Uuid::new_v4().to_string();
                        println!("Conversation: {}", conversation_id);
                        continue;
                    }
                    "/id" => {
                        println!("{}", conversation_id);
                        continue;
                    }
                    "/help" => {
                        print_help();
                        continue;
                    }
                    cmd if cmd.starts_with('/') => {
                        println!("Unknown command: {}", cmd);
                        continue;
                    }
                    _ => {}
                }

                println!();
                match copilot.handle(line, &conversation_id).await {
                    Ok(reply) => println!("{}\n", reply.text()),
                    Err(e) => eprintln!("Error: {}\n", e),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("Goodbye!");
                break;
            }
            Err(err) => {
                eprintln!("Error: {:?}", err);
                break;
            }
        }
    }

    if let Some(parent) = history_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let _ = rl.save_history(&history_path);
    Ok(())
}
