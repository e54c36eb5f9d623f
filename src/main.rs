use std::fs::{self, OpenOptions};
use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use finchat::app::App;
use finchat::config::{Config, API_URL_ENV};
use finchat::handler::handle_event;
use finchat::tui::{self, EventHandler, Tui};
use finchat::{ui, ChatTransport, ChatbotClient, Conversation, Submission};

#[derive(Parser)]
#[command(name = "finchat")]
#[command(version, about = "Terminal chat client for the FinAgent financial assistant")]
struct Cli {
    /// Backend base URL (overrides the config file)
    #[arg(long, global = true, env = API_URL_ENV)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive chat (default)
    Chat,
    /// Send a single message and print the reply
    Send {
        /// Message text
        message: String,
    },
    /// Check whether the backend is up
    Health,
    /// Save a backend URL to the config file
    SetUrl {
        /// Base URL, e.g. http://localhost:4000
        url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let (mut config, config_error) = Config::load();
    let api_url = config.resolve_api_url(cli.api_url.as_deref());
    let client = ChatbotClient::new(&api_url);

    let command = cli.command.unwrap_or(Commands::Chat);
    init_logging(config.log_filter(), matches!(command, Commands::Chat))?;
    if let Some(e) = config_error {
        warn!(error = %format!("{:#}", e), "using default settings");
    }
    info!(api_url = client.base_url(), "using chatbot backend");

    match command {
        Commands::Chat => run_chat(client, api_url).await,
        Commands::Send { message } => send_once(client, &message).await,
        Commands::Health => {
            let health = client.check_health().await?;
            println!("{}", health.status);
            Ok(())
        }
        Commands::SetUrl { url } => {
            config.api_url = Some(url.trim_end_matches('/').to_string());
            let path = config.save()?;
            println!("Saved backend URL to {}", path.display());
            Ok(())
        }
    }
}

/// TUI mode logs to a file so output doesn't tear the alternate screen
fn init_logging(default_filter: &str, to_file: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());
    let registry = tracing_subscriber::registry().with(filter);

    if to_file {
        let path = Config::log_path()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        registry
            .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
            .init();
    } else {
        registry.with(fmt::layer().with_writer(std::io::stderr)).init();
    }

    Ok(())
}

async fn send_once(client: ChatbotClient, message: &str) -> Result<()> {
    let mut conversation = Conversation::new(Arc::new(client));

    match conversation.submit(message) {
        Submission::Sent => {}
        Submission::Empty => bail!("Nothing to send: message is empty"),
        Submission::Busy => bail!("Nothing to send: a request is already in flight"),
    }

    conversation.wait_reply().await;
    if let Some(reply) = conversation.messages().last() {
        println!("{}", reply.content);
    }
    Ok(())
}

async fn run_chat(client: ChatbotClient, api_url: String) -> Result<()> {
    tui::install_panic_hook();
    let mut terminal = tui::init()?;

    let mut app = App::new(Arc::new(client), api_url);
    app.start_health_check();
    let mut events = EventHandler::new();

    let result = run_loop(&mut terminal, &mut app, &mut events).await;

    tui::restore()?;
    result
}

async fn run_loop(terminal: &mut Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        let Some(event) = events.next().await else {
            break;
        };
        handle_event(app, event);
        app.poll_background().await;
    }
    Ok(())
}
