//! threadline: run the search-enabled chat agent on one thread from the command line.
//!
//! Sends each message as a turn on `--thread-id`, printing every appended message
//! as it arrives, then prints the thread's final snapshot.

mod display;
mod logging;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use config::{AgentSettings, ConfigError, LoadError};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{error, info};

use threadline::{
    AgentError, ChatOpenAI, CheckpointError, Conversation, ConversationStore, JsonSerializer,
    SqliteSaver, TavilySearchTool, ToolRegistry, ToolSource, ToolSourceError, TurnController,
    TurnEvent, TurnOptions,
};

const APP_NAME: &str = "threadline";

/// Prompts used when no `-m/--message` is given.
const DEFAULT_MESSAGES: [&str; 2] = [
    "Hi there! My name is Mohamed Reda. and I have been happy for 100 years",
    "based on the chat history, How many years have Mohamed Reda been happy for?",
];

/// Content longer than this is truncated in the text snapshot.
const SNAPSHOT_CONTENT_MAX: usize = 200;

#[derive(Parser, Debug)]
#[command(name = "threadline")]
#[command(about = "Chat with a search-enabled model on a checkpointed thread")]
struct Args {
    /// Thread ID; turns on the same thread share history
    #[arg(long, value_name = "ID", default_value = "1")]
    thread_id: String,

    /// Persist checkpoints in this SQLite file (default: in memory)
    #[arg(long, value_name = "PATH")]
    db: Option<PathBuf>,

    /// Message to send as one turn; repeat for several turns
    #[arg(short, long = "message", value_name = "TEXT")]
    messages: Vec<String>,

    /// Print the final snapshot as JSON
    #[arg(long)]
    json: bool,

    /// System prompt sent before the conversation on every model call
    #[arg(long, value_name = "PROMPT")]
    system: Option<String>,
}

#[derive(Debug, Error)]
enum CliError {
    #[error("loading configuration: {0}")]
    Load(#[from] LoadError),
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("opening checkpoint store: {0}")]
    Checkpoint(#[from] CheckpointError),
    #[error("listing tools: {0}")]
    Tools(#[from] ToolSourceError),
    #[error(transparent)]
    Agent(#[from] AgentError),
    #[error("encoding snapshot: {0}")]
    Json(#[from] serde_json::Error),
}

fn open_store(db: Option<&PathBuf>) -> Result<ConversationStore, CheckpointError> {
    match db {
        Some(path) => {
            let saver = SqliteSaver::<Conversation>::new(path, Arc::new(JsonSerializer))?;
            info!(path = %path.display(), "using sqlite checkpoints");
            Ok(ConversationStore::new(Arc::new(saver)))
        }
        None => Ok(ConversationStore::in_memory()),
    }
}

async fn build_controller(
    args: &Args,
    settings: &AgentSettings,
) -> Result<TurnController, CliError> {
    let search = TavilySearchTool::new(settings.tavily_api_key.clone())
        .with_max_results(settings.search_max_results);
    let tools: Arc<dyn ToolSource> = Arc::new(ToolRegistry::new().with_tool(Box::new(search)));

    let llm = ChatOpenAI::for_endpoint(
        settings.openai_base_url.clone(),
        settings.openai_api_key.as_deref(),
        settings.openai_model.clone(),
    )
    .with_tools(tools.list_tools().await?);
    info!(
        base_url = %settings.openai_base_url,
        model = %settings.openai_model,
        "model client ready"
    );

    let store = Arc::new(open_store(args.db.as_ref())?);
    Ok(
        TurnController::new(Arc::new(llm), tools, store).with_options(TurnOptions {
            model_timeout: settings.model_timeout,
            tool_timeout: settings.tool_timeout,
            max_model_calls: settings.max_model_calls,
            system_prompt: args.system.clone(),
        }),
    )
}

/// Runs one turn, printing each appended message as it arrives.
async fn run_printed_turn(
    controller: &TurnController,
    thread_id: &str,
    text: &str,
) -> Result<(), AgentError> {
    let (tx, mut rx) = mpsc::channel::<TurnEvent>(64);
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if let TurnEvent::Appended(message) = event {
                println!("{}", display::format_message(&message));
            }
        }
    });
    let result = controller
        .run_turn_with_events(thread_id, text, Some(tx))
        .await;
    let _ = printer.await;
    result.map(|_| ())
}

async fn run(args: Args) -> Result<(), CliError> {
    let settings = AgentSettings::from_env()?;
    let controller = build_controller(&args, &settings).await?;

    let messages: Vec<String> = if args.messages.is_empty() {
        DEFAULT_MESSAGES.iter().map(|m| m.to_string()).collect()
    } else {
        args.messages.clone()
    };
    for text in &messages {
        run_printed_turn(&controller, &args.thread_id, text).await?;
    }

    let snapshot = controller.store().snapshot(&args.thread_id).await?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        println!(
            "{}",
            display::format_snapshot(&snapshot, SNAPSHOT_CONTENT_MAX)
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let load = config::load_and_apply(APP_NAME, None);
    if let Err(e) = logging::init() {
        eprintln!("threadline: logging init failed: {}", e);
    }
    let args = Args::parse();

    let result = match load {
        Ok(()) => run(args).await,
        Err(e) => Err(CliError::from(e)),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "threadline failed");
            eprintln!("threadline: {}", e);
            ExitCode::FAILURE
        }
    }
}
