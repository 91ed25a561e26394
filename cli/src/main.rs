mod render;

use std::io;
use std::time::Duration;

use clap::{Parser, Subcommand};
use client_rust::net::http::HttpConnector;
use client_rust::state::session::ClientSession;
use tokio::io::{AsyncBufReadExt, BufReader};

use render::Renderer;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("health check failed: HTTP {0}")]
    Unhealthy(u16),
    #[error("terminal i/o failed: {0}")]
    Io(#[from] io::Error),
}

#[derive(Parser, Debug)]
#[command(name = "fortune-cli", about = "Streaming client for the fortune relay")]
struct Cli {
    #[arg(long, env = "FORTUNE_BASE_URL", default_value = "http://127.0.0.1:3000")]
    base_url: String,

    #[arg(long, env = "FORTUNE_SIDE_PAYLOAD_DELAY_MS", default_value_t = 1000)]
    side_payload_delay_ms: u64,

    #[arg(short, long, help = "Log connection details to stderr")]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Ping,
    /// Ask one question (or get the greeting) and exit when the reading ends.
    Ask {
        question: Option<String>,
    },
    /// Interactive session. `/new` restarts, `/quit` exits.
    Chat,
}

enum Input {
    Update(Option<client_rust::state::session::SessionUpdate>),
    Line(Option<String>),
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Command::Ping => run_ping(&cli).await,
        Command::Ask { question } => run_ask(&cli, question.as_deref()).await,
        Command::Chat => run_chat(&cli).await,
    }
}

/// Logs go to stderr so stdout carries only the conversation.
fn init_tracing(verbose: bool) {
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::WARN };
    tracing_subscriber::fmt().with_writer(io::stderr).with_max_level(level).init();
}

fn new_session(cli: &Cli) -> ClientSession<HttpConnector> {
    ClientSession::new(HttpConnector::new(cli.base_url.clone()))
        .with_side_payload_delay(Duration::from_millis(cli.side_payload_delay_ms))
}

async fn run_ping(cli: &Cli) -> Result<(), CliError> {
    let client = reqwest::Client::new();
    let url = format!("{}/healthz", cli.base_url.trim_end_matches('/'));
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(CliError::Unhealthy(status.as_u16()));
    }
    println!("ok");
    Ok(())
}

async fn run_ask(cli: &Cli, question: Option<&str>) -> Result<(), CliError> {
    let mut session = new_session(cli);
    if !question.is_some_and(|q| session.submit(q)) {
        session.start_conversation();
    }

    let mut renderer = Renderer::new(io::stdout());
    while let Some(update) = session.next_update().await {
        renderer.apply(session.messages(), update)?;
    }
    tracing::debug!(state = ?session.state(), "ask: finished");
    Ok(())
}

async fn run_chat(cli: &Cli) -> Result<(), CliError> {
    let mut session = new_session(cli);
    let mut renderer = Renderer::new(io::stdout());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    session.start_conversation();
    loop {
        let input = tokio::select! {
            update = session.next_update(), if session.is_active() => Input::Update(update),
            line = lines.next_line() => Input::Line(line?),
        };

        match input {
            Input::Update(Some(update)) => renderer.apply(session.messages(), update)?,
            Input::Update(None) => {}
            Input::Line(None) => break,
            Input::Line(Some(line)) => match line.trim() {
                "/quit" | "/exit" => break,
                "/new" => {
                    renderer.end_line()?;
                    session.start_conversation();
                }
                text => {
                    if session.submit(text) {
                        renderer.end_line()?;
                    }
                }
            },
        }
    }

    session.teardown();
    renderer.end_line()?;
    Ok(())
}
