use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod api;
mod app;
mod config;
mod format;
mod handler;
mod tui;
mod ui;
mod view;
mod widget;

use api::HttpChatApi;
use app::App;
use config::Config;
use format::{ReplyFormatter, Segment};
use view::TranscriptView;
use widget::{ChatWidget, ConnectionState};

#[derive(Parser)]
#[command(name = "cbci-chat", version)]
#[command(about = "Terminal client for the education data analysis chatbot")]
struct Cli {
    /// Backend base URL (overrides config and CBCI_CHAT_URL)
    #[arg(long, global = true)]
    base_url: Option<String>,
    /// Chat request timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,
    /// Log file for the interactive client
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive chat (default)
    Chat,
    /// Check whether the backend is reachable
    Status,
    /// Ask a single question and print the reply
    Ask {
        /// Your question
        question: String,
        /// Print the reply as HTML markup
        #[arg(long)]
        html: bool,
    },
    /// Write the effective configuration to the config file
    InitConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load()
        .context("failed to read config")?
        .with_overrides(std::env::var(config::BASE_URL_ENV).ok(), cli.base_url);
    if let Some(timeout) = cli.timeout {
        config.request_timeout_secs = timeout;
    }

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => {
            let log_path = match cli.log_file {
                Some(path) => path,
                None => Config::default_log_path()?,
            };
            init_file_logging(&log_path)?;
            run_chat(&config).await
        }
        Commands::Status => {
            init_stderr_logging();
            check_status(&config).await
        }
        Commands::Ask { question, html } => {
            init_stderr_logging();
            ask_once(&config, &question, html).await
        }
        Commands::InitConfig => {
            let path = config.save()?;
            println!("Wrote {}", path.display());
            Ok(())
        }
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("cbci_chat=info"))
}

/// The interactive client owns the terminal, so its logs go to a file.
fn init_file_logging(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn init_stderr_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .init();
}

fn build_widget(config: &Config) -> Result<ChatWidget<TranscriptView, HttpChatApi>> {
    let api = HttpChatApi::new(
        &config.base_url,
        Duration::from_secs(config.request_timeout_secs),
        Duration::from_secs(config.status_timeout_secs),
    )?;
    let formatter = ReplyFormatter::new(&config.keywords).context("invalid keyword list")?;
    Ok(ChatWidget::new(TranscriptView::new(formatter), Arc::new(api)))
}

async fn run_chat(config: &Config) -> Result<()> {
    let widget = build_widget(config)?;
    let mut app = App::new(widget, &config.base_url);
    tracing::info!(base_url = %config.base_url, "starting interactive client");

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = tui::EventHandler::new(tui::TICK_RATE);

    app.start_probe();
    let result = run_loop(&mut terminal, &mut app, &mut events).await;

    tui::restore()?;
    result
}

async fn run_loop(
    terminal: &mut tui::Tui,
    app: &mut App<HttpChatApi>,
    events: &mut tui::EventHandler,
) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event),
            None => break,
        }
        app.poll_tasks().await;
    }
    Ok(())
}

async fn check_status(config: &Config) -> Result<()> {
    let mut widget = build_widget(config)?;
    widget.probe_connection().await;

    let view = widget.view();
    println!("● {} ({}) {}", view.status_label, widget.connection().as_str(), config.base_url);
    if widget.connection() != ConnectionState::Connected {
        bail!("backend at {} is not available", config.base_url);
    }
    Ok(())
}

async fn ask_once(config: &Config, question: &str, html: bool) -> Result<()> {
    let mut widget = build_widget(config)?;
    if !widget.send_message(question).await {
        bail!("question is empty");
    }

    let (Some(reply), Some(rendered)) = (widget.history().last(), widget.view().messages.last()) else {
        bail!("no reply recorded");
    };
    if html {
        let formatter = ReplyFormatter::new(&config.keywords)?;
        println!("{}", formatter.format_reply(&reply.content));
    } else {
        println!("{}", plain_text(&rendered.segments));
    }

    if reply.is_error {
        bail!("request failed");
    }
    Ok(())
}

fn plain_text(segments: &[Segment]) -> String {
    segments
        .iter()
        .map(|segment| match segment {
            Segment::Text(text) | Segment::Emphasis(text) => text.as_str(),
            Segment::LineBreak => "\n",
        })
        .collect()
}
