//! CLI - Command Line Interface for theatre
//!
//! Every subcommand works on the catalog named by the config file or `--db`.
//!
//! # Examples
//!
//! ```bash
//! # Index the library
//! theatre scan --jobs 4
//!
//! # Query it
//! theatre find -t wire -s 1 --json
//!
//! # Play an episode, fetching subtitles if needed
//! theatre play -t wire -s 1 -e 3 -l eng
//!
//! # Browse interactively
//! theatre
//! ```

use clap::{ArgAction, Args, Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;

use crate::catalog::EpisodeQuery;
use crate::config::Overrides;
use crate::playback::PlayerType;

// =============================================================================
// Exit Codes
// =============================================================================

/// Process exit status of a subcommand, stable for scripts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    Success = 0,
    /// Anything else, including an unreadable config or catalog
    Error = 1,
    /// Bad flags or an invalid episode choice
    InvalidArgs = 2,
    NoMatch = 3,
    /// Player missing or failed to start
    PlayerFailed = 4,
}

impl ExitCode {
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        i32::from(code.code())
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> std::process::ExitCode {
        code.code().into()
    }
}

// =============================================================================
// Main CLI Structure
// =============================================================================

/// theatre - index a TV series library and browse it from the terminal
///
/// Run without arguments to launch the interactive menu.
#[derive(Parser, Debug)]
#[command(
    name = "theatre",
    version,
    about = "Index a directory of TV series and browse it from a terminal menu",
    after_help = "EXAMPLES:\n\
                  theatre                          Launch the menu\n\
                  theatre scan                     Re-index the library\n\
                  theatre find -t wire -s 1        List matching episodes\n\
                  theatre play -t wire -s 1 -e 3   Play an episode"
)]
pub struct Cli {
    /// Config file to read instead of the default location
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Catalog database file
    #[arg(long, short = 'd', global = true)]
    pub db: Option<PathBuf>,

    /// Library root directory
    #[arg(long, global = true)]
    pub library: Option<PathBuf>,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(long, short = 'v', action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Print results as JSON
    #[arg(long, short = 'j', global = true)]
    pub json: bool,

    /// What to do; the menu opens when this is omitted
    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// Whether the interactive menu should run
    pub fn is_tui_mode(&self) -> bool {
        matches!(self.command, None | Some(Command::Gui))
    }

    /// Default log filter when RUST_LOG is not set
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }

    /// Command-line values that win over the config file
    pub fn overrides(&self) -> Overrides {
        let mut overrides = Overrides {
            db: self.db.clone(),
            library: self.library.clone(),
            ..Overrides::default()
        };
        match &self.command {
            Some(Command::Scan(cmd)) => overrides.jobs = cmd.jobs,
            Some(Command::Play(cmd)) => {
                overrides.language = cmd.language.clone();
                overrides.player = cmd.player;
            }
            _ => {}
        }
        overrides
    }
}

// =============================================================================
// Subcommands
// =============================================================================

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Prune vanished files, index new ones and classify them
    Scan(ScanCmd),

    /// List episodes matching the filters
    #[command(visible_alias = "f")]
    Find(FindCmd),

    /// Play an episode with subtitles
    #[command(visible_alias = "p")]
    Play(PlayCmd),

    /// Launch the interactive menu
    Gui,
}

/// Re-index the library
#[derive(Args, Debug)]
pub struct ScanCmd {
    /// Worker threads for classification (1 = sequential)
    #[arg(long)]
    pub jobs: Option<usize>,
}

/// Shared episode filters
#[derive(Args, Debug, Clone, Default)]
pub struct EpisodeFilter {
    /// Case-insensitive part of the series name
    #[arg(long, short = 't')]
    pub title: Option<String>,

    /// Season number
    #[arg(long, short = 's')]
    pub season: Option<u32>,

    /// Episode number
    #[arg(long, short = 'e')]
    pub episode: Option<u32>,
}

impl EpisodeFilter {
    pub fn query(&self) -> EpisodeQuery {
        EpisodeQuery::new(self.title.clone(), self.season, self.episode)
    }
}

/// List episodes
#[derive(Args, Debug)]
pub struct FindCmd {
    #[command(flatten)]
    pub filter: EpisodeFilter,
}

/// Play an episode
#[derive(Args, Debug)]
pub struct PlayCmd {
    #[command(flatten)]
    pub filter: EpisodeFilter,

    /// Subtitle language (3-letter code, e.g. eng)
    #[arg(long, short = 'l')]
    pub language: Option<String>,

    /// Player to launch
    #[arg(long, short = 'p', value_enum)]
    pub player: Option<PlayerType>,
}

// =============================================================================
// Output Helpers
// =============================================================================

/// Where command results and diagnostics go
///
/// Results are written to stdout. Progress and errors go to stderr, so
/// `--json` output can be piped.
pub struct Output {
    pub json: bool,
    pub quiet: bool,
}

impl Output {
    pub fn new(cli: &Cli) -> Self {
        let Cli { json, quiet, .. } = *cli;
        Self { json, quiet }
    }

    pub fn print_json<T: Serialize>(&self, data: &T) -> anyhow::Result<()> {
        let text = serde_json::to_string_pretty(data)?;
        println!("{text}");
        Ok(())
    }

    pub fn line(&self, result: impl std::fmt::Display) {
        println!("{result}");
    }

    /// Report a failure on stderr and hand back `code` for the caller to return
    pub fn error(&self, msg: impl Into<String>, code: ExitCode) -> ExitCode {
        let msg: String = msg.into();
        if self.json {
            eprintln!("{}", serde_json::json!({ "error": msg, "exit_code": code.code() }));
        } else {
            eprintln!("Error: {msg}");
        }
        code
    }

    /// Progress note, silent with `--quiet` or `--json`
    pub fn info(&self, msg: impl std::fmt::Display) {
        if self.quiet || self.json {
            return;
        }
        eprintln!("{msg}");
    }
}

// =============================================================================
// Tests
// =============================================================================
