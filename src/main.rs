//! theatre - index a TV series library and browse it from the terminal
//!
//! Scans a directory of video and subtitle files into a SQLite catalog,
//! guesses series/season/episode from the file names, and plays episodes
//! with a matching subtitle.
//!
//! # Usage
//!
//! ```bash
//! # Launch the interactive menu
//! theatre
//!
//! # CLI mode (for automation)
//! theatre scan --jobs 4
//! theatre find -t wire --json
//! theatre play -t wire -s 1 -e 3 -l eng
//! ```

use std::fs::OpenOptions;
use std::io::{stdout, Stdout};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use theatre::app::{App, Effect};
use theatre::catalog::Catalog;
use theatre::cli::{Cli, Command, ExitCode, Output};
use theatre::commands;
use theatre::config::{Config, Settings};
use theatre::library::Library;
use theatre::models::LibraryItem;
use theatre::playback::{resolve_subtitle, LocalPlayer, SubtitleFetcher};
use theatre::ui;

/// Terminal type alias for convenience
type Tui = Terminal<CrosstermBackend<Stdout>>;

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    let output = Output::new(&cli);
    let settings = match Config::load(cli.config.as_deref())
        .and_then(|config| Settings::resolve(&config, cli.overrides()))
    {
        Ok(settings) => settings,
        Err(e) => {
            error!(error = %e, "Configuration error");
            return output.error(e.to_string(), ExitCode::Error).into();
        }
    };

    let catalog = match Catalog::open(&settings.db) {
        Ok(catalog) => catalog,
        Err(e) => {
            error!(error = %e, db = %settings.db.display(), "Cannot open catalog");
            return output
                .error(format!("Cannot open catalog: {}", e), ExitCode::Error)
                .into();
        }
    };
    let library = Library::new(catalog, settings.library.clone());

    if cli.is_tui_mode() {
        if let Err(e) = run_tui(&library, &settings).await {
            error!(error = %e, "Menu failed");
            return output.error(e.to_string(), ExitCode::Error).into();
        }
        return ExitCode::Success.into();
    }

    run_cli(&cli, &library, &settings, &output).await.into()
}

/// Run CLI command and return exit code
async fn run_cli(cli: &Cli, library: &Library, settings: &Settings, output: &Output) -> ExitCode {
    match &cli.command {
        Some(Command::Scan(_)) => commands::scan_cmd(library, settings, output),

        Some(Command::Find(cmd)) => commands::find_cmd(library, cmd, output),

        Some(Command::Play(cmd)) => {
            let fetcher = commands::subtitle_fetcher(settings);
            let fetcher = fetcher.as_ref().map(|f| f as &dyn SubtitleFetcher);
            commands::play_cmd(library, settings, cmd, fetcher, output).await
        }

        // Handled by the caller
        Some(Command::Gui) | None => ExitCode::Success,
    }
}

// =============================================================================
// Logging
// =============================================================================

/// Log to a file while the menu owns the terminal, to stderr otherwise
fn init_logging(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level()));

    if cli.is_tui_mode() {
        let file = dirs::cache_dir()
            .map(|dir| dir.join("theatre"))
            .and_then(|dir| std::fs::create_dir_all(&dir).ok().map(|_| dir))
            .and_then(|dir| {
                OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(dir.join("theatre.log"))
                    .ok()
            });
        if let Some(file) = file {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        // No cache dir: the menu runs without a log
        return;
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

// =============================================================================
// TUI Mode
// =============================================================================

/// Raw mode on the alternate screen, as the menu needs it
fn enter_screen(out: &mut impl std::io::Write) -> Result<()> {
    enable_raw_mode()?;
    execute!(out, EnterAlternateScreen)?;
    Ok(())
}

fn init_terminal() -> Result<Tui> {
    let mut out = stdout();
    enter_screen(&mut out)?;
    Ok(Terminal::new(CrosstermBackend::new(out))?)
}

/// Back to the cooked main screen, for exit or for the player
fn restore_terminal(terminal: &mut Tui) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

fn resume_terminal(terminal: &mut Tui) -> Result<()> {
    enter_screen(terminal.backend_mut())?;
    terminal.clear()?;
    Ok(())
}

/// Run interactive TUI
async fn run_tui(library: &Library, settings: &Settings) -> Result<()> {
    let mut terminal = init_terminal()?;
    let mut app = App::new(library.catalog());

    let result = run_event_loop(&mut terminal, &mut app, library, settings).await;
    restore_terminal(&mut terminal)?;
    result
}

/// Main event loop - handles input, runs effects, renders UI
async fn run_event_loop(
    terminal: &mut Tui,
    app: &mut App,
    library: &Library,
    settings: &Settings,
) -> Result<()> {
    const TICK_RATE: Duration = Duration::from_millis(100);

    let fetcher = commands::subtitle_fetcher(settings);

    while app.running {
        terminal.draw(|frame| ui::render(frame, app))?;

        if !event::poll(TICK_RATE)? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        // Only handle key press events (ignore releases on Windows)
        if key.kind != KeyEventKind::Press {
            continue;
        }

        match app.handle_key(key, library.catalog()) {
            Effect::None | Effect::Quit => {}
            Effect::Refresh => {
                app.set_status("scanning...");
                terminal.draw(|frame| ui::render(frame, app))?;
                match library.scan_parallel(settings.jobs) {
                    Ok(summary) => {
                        info!(%summary, "Rescanned library");
                        app.set_status(summary.to_string());
                    }
                    Err(e) => {
                        error!(error = %e, "Rescan failed");
                        app.set_status(format!("error: {}", e));
                    }
                }
                app.reload(library.catalog());
            }
            Effect::Play(episode) => {
                let fetcher = fetcher
                    .as_ref()
                    .filter(|_| settings.sub_language.is_some())
                    .map(|f| f as &dyn SubtitleFetcher);

                restore_terminal(terminal)?;
                let status = play_episode(library, settings, fetcher, &episode).await;
                resume_terminal(terminal)?;

                app.set_status(status);
                // A downloaded subtitle is a new catalog row
                app.reload(library.catalog());
            }
        }
    }

    Ok(())
}

/// Resolve a subtitle and run the player in the foreground
async fn play_episode(
    library: &Library,
    settings: &Settings,
    fetcher: Option<&dyn SubtitleFetcher>,
    episode: &LibraryItem,
) -> String {
    let language = settings.sub_language.as_deref().unwrap_or_default();
    let subtitle = resolve_subtitle(library, fetcher, episode, language).await;

    let player = LocalPlayer::new(settings.player);
    match player
        .play_and_wait(&episode.path(), subtitle.path().as_deref())
        .await
    {
        Ok(()) => subtitle.describe(),
        Err(e) => {
            error!(error = %e, "Player failed");
            format!("error: {}", e)
        }
    }
}
