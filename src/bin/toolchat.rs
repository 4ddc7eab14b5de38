//! toolchat: chat with a tool-calling model from the terminal
//!
//! Usage:
//!   toolchat [--stream] [--model <id>] [--system <text>] [prompt...]
//!
//! With a prompt on the command line, answers it and exits. Otherwise reads one
//! prompt per line from stdin, keeping the conversation going until EOF.

use ai_tool_chat::{
    ClientConfig, Conversation, ConversationEvent, Message, OpenAiProvider, ToolRegistry,
};
use anyhow::{bail, Context};
use futures::StreamExt;
use std::io::{BufRead, Write};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

struct Args {
    stream: bool,
    model: Option<String>,
    system: Option<String>,
    prompt: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = match parse_args(std::env::args().skip(1))? {
        Some(args) => args,
        None => return Ok(()),
    };

    let mut config = ClientConfig::from_env().context("failed to load configuration")?;
    if let Some(model) = args.model {
        config = config.with_model(model);
    }
    if let Some(system) = args.system {
        config = config.with_system_prompt(system);
    }

    let provider = Arc::new(OpenAiProvider::new(&config)?);
    let registry = Arc::new(ToolRegistry::with_builtin_tools());
    tracing::info!(
        model = %config.model,
        tools = ?registry.names().collect::<Vec<_>>(),
        "starting toolchat"
    );
    let conversation = Conversation::new(provider, registry);

    let mut history = vec![Message::system(config.system_prompt.clone())];
    if let Some(prompt) = args.prompt {
        history.push(Message::user(prompt));
        ask(&conversation, history, args.stream).await?;
        return Ok(());
    }

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        let prompt = line.trim();
        if prompt.is_empty() {
            continue;
        }
        if let Err(e) = handle_prompt(&conversation, &mut history, prompt, args.stream).await {
            eprintln!("Error: {e:#}");
        }
    }
    Ok(())
}

/// Run one REPL turn. On failure the history is left as it was before the prompt.
async fn handle_prompt(
    conversation: &Conversation,
    history: &mut Vec<Message>,
    prompt: &str,
    stream: bool,
) -> anyhow::Result<()> {
    let mut turn = history.clone();
    turn.push(Message::user(prompt));
    *history = ask(conversation, turn, stream).await?;
    Ok(())
}

/// Answer the last user turn, print it, and return the grown history.
async fn ask(
    conversation: &Conversation,
    history: Vec<Message>,
    stream: bool,
) -> anyhow::Result<Vec<Message>> {
    if !stream {
        let outcome = conversation.run_with_history(history).await?;
        println!("Assistant: {}", outcome.content());
        return Ok(outcome.history);
    }

    let mut events = conversation.run_streaming_with_history(history);
    let mut stdout = std::io::stdout();
    write!(stdout, "Assistant: ")?;
    stdout.flush()?;
    while let Some(event) = events.next().await {
        match event? {
            ConversationEvent::ContentDelta(delta) => {
                write!(stdout, "{delta}")?;
                stdout.flush()?;
            }
            ConversationEvent::ToolResult { name, content, .. } => {
                tracing::debug!(tool = %name, result = %content, "tool result");
            }
            ConversationEvent::Finished { history, .. } => {
                writeln!(stdout)?;
                return Ok(history);
            }
        }
    }
    bail!("stream ended before the model finished")
}

fn parse_args(mut argv: impl Iterator<Item = String>) -> anyhow::Result<Option<Args>> {
    let mut args = Args {
        stream: false,
        model: None,
        system: None,
        prompt: None,
    };
    let mut words = Vec::new();

    while let Some(arg) = argv.next() {
        match arg.as_str() {
            "--stream" | "-s" => args.stream = true,
            "--model" | "-m" => {
                args.model = Some(argv.next().context("--model needs a value")?);
            }
            "--system" => {
                args.system = Some(argv.next().context("--system needs a value")?);
            }
            "--version" | "-V" => {
                println!("toolchat {}", env!("CARGO_PKG_VERSION"));
                return Ok(None);
            }
            "--help" | "-h" => {
                print_usage();
                return Ok(None);
            }
            other if other.starts_with('-') => {
                eprintln!("Unknown option: {other}");
                eprintln!();
                print_usage();
                std::process::exit(1);
            }
            _ => words.push(arg),
        }
    }

    if !words.is_empty() {
        args.prompt = Some(words.join(" "));
    }
    Ok(Some(args))
}

fn print_usage() {
    println!(
        r#"toolchat: chat with a tool-calling model

USAGE:
    toolchat [OPTIONS] [PROMPT...]

OPTIONS:
    -s, --stream            Print the answer as it is generated
    -m, --model <id>        Model identifier (default: gpt-4o)
        --system <text>     System prompt
    -V, --version           Show version information
    -h, --help              Show this help message

With no PROMPT, one prompt per line is read from stdin.

ENVIRONMENT:
    OPENAI_API_KEY          API key (the OS keyring entry ai-tool-chat/openai wins)
    OPENAI_BASE_URL         Endpoint base URL
    AI_TOOL_CHAT_MODEL      Default model
    AI_HTTP_TIMEOUT_SECS    Request timeout in seconds
    RUST_LOG                Log filter, e.g. ai_tool_chat=debug"#
    );
}
