use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

mod app;
mod backend;
mod chat;
mod config;
mod handler;
mod logging;
mod tui;
mod ui;

use app::App;
use backend::HttpBackend;
use chat::{ChatState, ReprocessOutcome, SendOutcome, REPROCESS_SUCCESS_TEXT, SEND_ERROR_TEXT};
use config::{Config, BACKEND_URL_ENV};

#[derive(Parser, Debug)]
#[command(name = "talk2dau", version)]
#[command(about = "Terminal client for the Talk 2 DAU university assistant")]
#[command(long_about = "Talk 2 DAU answers questions about Dhirubhai Ambani University: \
courses, admissions, campus life. Run without a subcommand for the full-screen chat.\n\n\
Environment Variables:\n\
  TALK2DAU_BACKEND_URL   Backend base URL (defaults to http://localhost:8000)\n\
  RUST_LOG               Log filter, overrides -v")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Backend base URL
    #[arg(long, global = true)]
    backend_url: Option<String>,

    /// Write logs here instead of the default log file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ask a single question and print the reply
    Say {
        /// Your question
        message: String,
    },
    /// Ask the backend to rebuild its knowledge base from its documents
    Reprocess,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load()?;
    let backend_url = config.resolve_backend_url(
        cli.backend_url.as_deref(),
        std::env::var(BACKEND_URL_ENV).ok(),
    );
    let backend = HttpBackend::new(&backend_url, config.request_timeout())?;

    match cli.command {
        None => {
            let log_path = cli
                .log_file
                .or_else(|| config.log_file.clone())
                .or_else(logging::default_log_path);
            if let Some(path) = log_path {
                logging::init_file(&path, cli.verbose)?;
            }
            tracing::info!(%backend_url, "starting chat client");
            run_tui(App::new(Arc::new(backend), backend_url)).await
        }
        Some(Commands::Say { message }) => {
            logging::init_stderr(cli.verbose)?;
            say(&backend, message).await
        }
        Some(Commands::Reprocess) => {
            logging::init_stderr(cli.verbose)?;
            reprocess(&backend).await
        }
    }
}

async fn run_tui(app: App) -> Result<()> {
    tui::install_panic_hook();
    let mut terminal = tui::init().context("Failed to initialise terminal")?;

    let result = run_app(&mut terminal, app).await;

    tui::restore()?;
    result
}

async fn run_app(terminal: &mut tui::Tui, mut app: App) -> Result<()> {
    let mut events = tui::EventHandler::new(tui::TICK_RATE);

    while !app.should_quit {
        terminal.draw(|frame| ui::render(&mut app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(&mut app, event)?,
            None => break,
        }

        app.poll_tasks().await;
    }

    if app.has_pending_tasks() {
        tracing::debug!("quitting with requests still in flight");
    }
    Ok(())
}

async fn say(backend: &HttpBackend, message: String) -> Result<()> {
    let mut chat = ChatState::new();
    chat.set_input(message);

    match chat.submit(backend).await {
        SendOutcome::Replied => {
            if let Some(reply) = chat.messages().last() {
                println!("{}", reply.text);
            }
            Ok(())
        }
        SendOutcome::Failed => bail!(SEND_ERROR_TEXT),
        SendOutcome::Skipped => bail!("Message is empty"),
    }
}

async fn reprocess(backend: &HttpBackend) -> Result<()> {
    let mut chat = ChatState::new();

    match chat.reprocess(backend).await {
        ReprocessOutcome::Succeeded => {
            println!("{}", REPROCESS_SUCCESS_TEXT);
            Ok(())
        }
        _ => match chat.messages().last() {
            Some(message) => bail!("{}", message.text),
            None => bail!("Reprocess did not run"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_no_subcommand_launches_chat() {
        let cli = Cli::try_parse_from(["talk2dau"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "talk2dau",
            "say",
            "When is the next admission deadline?",
            "--backend-url",
            "http://campus:8000",
            "-vv",
        ])
        .unwrap();
        assert_eq!(cli.backend_url.as_deref(), Some("http://campus:8000"));
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Some(Commands::Say { message }) => {
                assert_eq!(message, "When is the next admission deadline?")
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_reprocess_subcommand() {
        let cli = Cli::try_parse_from(["talk2dau", "reprocess"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Reprocess)));
    }
}
