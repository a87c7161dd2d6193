//! coshell - shared todo list, broadcast chat and QR codes in one terminal
//!
//! # Usage
//!
//! ```text
//! coshell                      # Interactive main menu
//! coshell ui                   # Split-pane todo + chat UI
//! coshell server <port>        # Standalone chat server
//! coshell client <host> <port> # Standalone line-oriented chat client
//! ```

use std::fs::{self, OpenOptions};
use std::io::{self, Stdout};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crossterm::{
    event::{self, Event as CrosstermEvent},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

use coshell_chat::{connect_and_run, ChatServer};
use coshell_core::{Config, QrEncode, TodoList};
use coshell_tui::app::App;
use coshell_tui::error::{Result as TuiResult, TuiError};
use coshell_tui::input::{handle_key_event, Action, Event};
use coshell_tui::{run_menu, spawn_chat, ui, ChatLink, MenuChoice};

// ============================================================================
// CLI Arguments
// ============================================================================

/// coshell - terminal collaboration: todo list, chat and QR codes
#[derive(Parser, Debug)]
#[command(name = "coshell")]
#[command(about = "Shared todo list, broadcast chat and QR codes in one terminal")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Config file (default: $COSHELL_CONFIG or <config dir>/coshell/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the split-pane todo + chat UI
    Ui,
    /// Run the chat server
    Server {
        /// TCP port to listen on
        port: u16,
    },
    /// Connect to a chat server and chat over stdin/stdout
    Client {
        /// Server host name or address
        host: String,
        /// Server port
        port: u16,
    },
}

// ============================================================================
// Terminal Setup / Cleanup
// ============================================================================

fn setup_terminal() -> TuiResult<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode().map_err(|e| TuiError::TerminalInit(e.to_string()))?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).map_err(|e| TuiError::TerminalInit(e.to_string()))?;

    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).map_err(|e| TuiError::TerminalInit(e.to_string()))
}

fn cleanup_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> TuiResult<()> {
    disable_raw_mode().map_err(|e| TuiError::TerminalCleanup(e.to_string()))?;

    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .map_err(|e| TuiError::TerminalCleanup(e.to_string()))?;

    terminal
        .show_cursor()
        .map_err(|e| TuiError::TerminalCleanup(e.to_string()))?;

    Ok(())
}

// ============================================================================
// Keyboard Input Task
// ============================================================================

fn spawn_keyboard_task(
    event_tx: mpsc::UnboundedSender<Event>,
    cancel_token: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            if cancel_token.is_cancelled() {
                debug!("Keyboard task shutting down");
                break;
            }

            let poll_result = tokio::task::spawn_blocking(|| {
                if event::poll(Duration::from_millis(50)).unwrap_or(false) {
                    event::read().ok()
                } else {
                    None
                }
            })
            .await;

            match poll_result {
                Ok(Some(CrosstermEvent::Key(key))) => {
                    if event_tx.send(Event::Key(key)).is_err() {
                        debug!("Event channel closed, keyboard task exiting");
                        break;
                    }
                }
                Ok(Some(CrosstermEvent::Resize(width, height))) => {
                    if event_tx.send(Event::Resize(width, height)).is_err() {
                        break;
                    }
                }
                Ok(Some(_)) | Ok(None) => {}
                Err(e) => {
                    error!(error = %e, "Keyboard polling task panicked");
                    break;
                }
            }
        }
    })
}

// ============================================================================
// Main Event Loop
// ============================================================================

/// Collaborators the event loop dispatches actions to.
struct Services {
    todos: TodoList,
    qr: QrEncode,
    event_tx: mpsc::UnboundedSender<Event>,
    chat: Option<ChatLink>,
}

impl Services {
    fn perform(&mut self, action: Action, app: &mut App, cancel_token: &CancellationToken) {
        match action {
            Action::None | Action::Quit => {}
            Action::AddTodo(item) => {
                app.add_todo(&self.todos, &item);
            }
            Action::RenderQr(path) => {
                // Runs an external program; keep it off the async workers.
                tokio::task::block_in_place(|| app.show_qr(&self.qr, &path));
            }
            Action::ConnectChat { host, port } => {
                info!(host = %host, port, "Connecting chat pane");
                app.chat_connecting(format!("{host}:{port}"));
                self.chat = Some(spawn_chat(
                    host,
                    port,
                    self.event_tx.clone(),
                    cancel_token.child_token(),
                ));
            }
            Action::SendChat(line) => match &self.chat {
                Some(link) if link.send_line(&line) => app.chat_sent(&line),
                _ => app.set_error("Chat connection is closed"),
            },
        }
    }
}

async fn run_event_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut App,
    services: &mut Services,
    event_rx: &mut mpsc::UnboundedReceiver<Event>,
    cancel_token: &CancellationToken,
) -> Result<()> {
    let tick_rate = Duration::from_millis(100);

    loop {
        terminal.draw(|frame| ui::render(frame, app))?;

        let event = tokio::time::timeout(tick_rate, event_rx.recv()).await;

        match event {
            Ok(Some(Event::Key(key))) => {
                let action = handle_key_event(key, app);
                if action == Action::Quit {
                    info!("User requested quit");
                    cancel_token.cancel();
                    break;
                }
                services.perform(action, app, cancel_token);
            }
            Ok(Some(Event::Resize(_width, _height))) => {
                debug!("Terminal resized");
            }
            Ok(Some(Event::ChatConnected { target })) => {
                info!(peer = %target, "Chat pane connected");
                app.chat_connected(target);
            }
            Ok(Some(Event::ChatData(bytes))) => {
                app.chat_received(&bytes);
            }
            Ok(Some(Event::ChatClosed)) => {
                info!("Chat pane connection closed");
                services.chat = None;
                app.chat_closed();
            }
            Ok(Some(Event::ChatFailed(reason))) => {
                warn!(reason = %reason, "Chat pane connection failed");
                services.chat = None;
                app.chat_failed(reason);
            }
            Ok(None) => {
                warn!("Event channel closed");
                break;
            }
            Err(_) => {}
        }

        if app.should_quit || cancel_token.is_cancelled() {
            cancel_token.cancel();
            break;
        }
    }

    Ok(())
}

// ============================================================================
// Modes
// ============================================================================

async fn run_ui(config: &Config) -> Result<()> {
    let todos = TodoList::load(&config.todo.path, config.todo.max_items)
        .with_context(|| format!("Failed to load todo list {}", config.todo.path.display()))?;
    info!(count = todos.len(), "Todo list loaded");

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();
    let cancel_token = CancellationToken::new();

    let mut app = App::with_todos(todos.items());
    let mut services = Services {
        todos,
        qr: QrEncode::from_config(&config.qr),
        event_tx: event_tx.clone(),
        chat: None,
    };

    let mut terminal = match setup_terminal() {
        Ok(t) => t,
        Err(e) => {
            error!(error = %e, "Failed to initialize terminal");
            return Err(e.into());
        }
    };

    let keyboard_handle = spawn_keyboard_task(event_tx, cancel_token.clone());

    let result = run_event_loop(
        &mut terminal,
        &mut app,
        &mut services,
        &mut event_rx,
        &cancel_token,
    )
    .await;

    cancel_token.cancel();
    let _ = tokio::time::timeout(Duration::from_millis(100), keyboard_handle).await;

    if let Err(e) = cleanup_terminal(&mut terminal) {
        error!(error = %e, "Failed to cleanup terminal");
    }

    info!("coshell UI stopped");
    result
}

async fn run_server(config: &Config, port: u16) -> Result<()> {
    let cancel_token = CancellationToken::new();

    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        if let Err(e) = wait_for_shutdown_signal().await {
            error!(error = %e, "Error waiting for shutdown signal");
        }
        info!("Shutdown signal received");
        shutdown_token.cancel();
    });

    let server = ChatServer::bind(
        (config.server.host.as_str(), port),
        config.server.max_clients,
        cancel_token,
    )
    .await
    .with_context(|| format!("Failed to start chat server on port {port}"))?;

    println!("Chat server listening on port {port}...");
    info!(
        addr = %server.local_addr(),
        max_clients = config.server.max_clients,
        "Chat server started"
    );

    if let Err(e) = server.run().await {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Chat server stopped");
    Ok(())
}

async fn run_client(host: &str, port: u16) -> Result<()> {
    let input = tokio::io::BufReader::new(tokio::io::stdin());
    let summary = connect_and_run(host, port, input, tokio::io::stdout()).await?;

    info!(
        end = ?summary.end,
        lines_sent = summary.lines_sent,
        bytes_sent = summary.bytes_sent,
        "Chat client finished"
    );
    println!("Chat client exiting.");
    Ok(())
}

async fn run_interactive(config: &Config) -> Result<()> {
    let choice = tokio::task::spawn_blocking(|| {
        let mut stdin = io::stdin().lock();
        let mut stdout = io::stdout();
        run_menu(&mut stdin, &mut stdout)
    })
    .await
    .context("Menu task failed")?
    .context("Failed to run menu")?;

    info!(?choice, "Menu choice");
    match choice {
        MenuChoice::RunServer { port } => run_server(config, port).await,
        MenuChoice::RunUi => run_ui(config).await,
        MenuChoice::Exit => Ok(()),
    }
}

async fn wait_for_shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("Received Ctrl+C");
    }

    Ok(())
}

// ============================================================================
// Logging Setup
// ============================================================================

const LOG_DIRECTIVES: [&str; 4] = [
    "coshell=info",
    "coshell_chat=info",
    "coshell_core=info",
    "coshell_tui=info",
];

fn env_filter() -> EnvFilter {
    LOG_DIRECTIVES
        .iter()
        .filter_map(|directive| directive.parse::<Directive>().ok())
        .fold(EnvFilter::from_default_env(), EnvFilter::add_directive)
}

/// Logs to stderr; used by the server, which does not own the terminal.
fn init_stderr_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(io::stderr)
        .init();
}

/// Logs to the state-dir log file, or nowhere if it cannot be opened.
fn init_file_logging() {
    if let Some(file) = create_log_file() {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter())
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new("off"))
            .init();
    }
}

fn get_log_dir() -> Option<PathBuf> {
    dirs::state_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".local/state")))
        .map(|dir| dir.join("coshell"))
}

fn create_log_file() -> Option<fs::File> {
    let log_dir = get_log_dir()?;

    if let Err(e) = fs::create_dir_all(&log_dir) {
        eprintln!("Warning: Failed to create log directory {log_dir:?}: {e}");
        return None;
    }

    let log_path = log_dir.join("coshell.log");

    match OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        Ok(file) => Some(file),
        Err(e) => {
            eprintln!("Warning: Failed to open log file {log_path:?}: {e}");
            None
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    Ok(config)
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    match &args.command {
        Some(Command::Server { .. }) => init_stderr_logging(),
        _ => init_file_logging(),
    }

    info!(version = env!("CARGO_PKG_VERSION"), "coshell starting");

    let config = load_config(args.config.as_deref()).context("Failed to load configuration")?;

    match args.command {
        None => run_interactive(&config).await,
        Some(Command::Ui) => run_ui(&config).await,
        Some(Command::Server { port }) => run_server(&config, port).await,
        Some(Command::Client { host, port }) => run_client(&host, port).await,
    }
}
