//! `MeshChat` — decentralized terminal group chat.
//!
//! Joins a room on the mesh and launches the TUI. Configuration via CLI
//! flags, environment variables, or a config file
//! (`~/.config/meshchat/config.toml`).
//!
//! ```bash
//! cargo run --bin meshchat -- --username alice --room lobby
//! ```
//!
//! Commands inside the chat: `/quit`, `/r <room>`, `/u <name>`,
//! `/send <path>`.

use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use tokio::sync::mpsc;
use tracing_appender::non_blocking::WorkerGuard;

use meshchat::app::App;
use meshchat::config::{CliArgs, ClientConfig};
use meshchat::dispatcher::{self, DisplayEvent, UserInput};
use meshchat::mesh::local::LocalMesh;
use meshchat::ui;

#[tokio::main]
async fn main() -> io::Result<()> {
    let cli = CliArgs::parse();

    // Load and resolve configuration (CLI args > config file > env > defaults).
    let config = match ClientConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Warning: failed to load config file: {e}");
            ClientConfig::default()
        }
    };

    // Initialize logging before terminal setup (logs go to file, not stdout).
    let _log_guard = init_logging(&cli.log_level, cli.log_file.as_deref());

    tracing::info!("meshchat starting");

    // The binary runs on the in-process mesh (single-process demo mode);
    // a networked deployment supplies its own MeshNode implementation.
    let mesh = LocalMesh::new();
    let node = Arc::new(mesh.node(format!("peer-{}", std::process::id())));

    let spawned = dispatcher::spawn_dispatcher(
        node,
        &config.username,
        &config.room,
        config.to_room_config(),
        config.to_dispatcher_config(),
    )
    .await;

    let (input_tx, display_rx) = match spawned {
        Ok(channels) => channels,
        Err(e) => {
            // Join failure at startup is fatal; there is no session to keep.
            eprintln!("could not join room '{}': {e}", config.room);
            return Err(io::Error::other(e.to_string()));
        }
    };

    // Set up terminal.
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app.
    let result = run_app(&mut terminal, input_tx, display_rx, &config).await;

    // Restore terminal.
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    tracing::info!("meshchat exiting");
    result
}

/// Initialize file-based logging.
///
/// Logs are written to a file (never stdout, since ratatui owns the
/// terminal). Returns a [`WorkerGuard`] that must be held until shutdown
/// to ensure all buffered log entries are flushed.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let default_path = std::env::temp_dir().join("meshchat.log");
    let log_path = file_path.unwrap_or(&default_path);

    let log_dir = log_path.parent()?;
    let file_name = log_path.file_name()?.to_str()?;

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .init();

    Some(guard)
}

/// Main TUI loop: draw, drain dispatcher events, poll for key input.
async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    input_tx: mpsc::Sender<UserInput>,
    mut display_rx: mpsc::Receiver<DisplayEvent>,
    config: &ClientConfig,
) -> io::Result<()> {
    let mut app = App::new(&config.room, &config.username);

    loop {
        // Drain everything the dispatcher produced since the last frame.
        while let Ok(event) = display_rx.try_recv() {
            app.apply(event);
        }

        terminal.draw(|frame| ui::draw(frame, &app))?;

        if app.should_quit {
            let _ = input_tx.send(UserInput::Shutdown).await;
            return Ok(());
        }

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()?
                && key.kind == KeyEventKind::Press
                && let Some(line) = app.handle_key_event(key)
                && input_tx.send(UserInput::Line(line)).await.is_err()
            {
                // Dispatcher is gone; nothing left to do.
                return Ok(());
            }
        }
    }
}
