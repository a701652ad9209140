//! theatre - a TV series library indexer with a terminal menu
//!
//! # Modules
//!
//! - `models` - Library items, item kinds and classification guesses
//! - `catalog` - SQLite-backed store and episode queries
//! - `library` - Directory scanning, pruning and classification
//! - `playback` - Player launching and on-demand subtitles
//! - `api` - TMDB client used to find a series' IMDB id
//! - `app` - Menu navigation state machine
//! - `ui` - TUI rendering
//! - `cli`, `commands`, `config` - Command-line surface

pub mod api;
pub mod app;
pub mod catalog;
pub mod cli;
pub mod commands;
pub mod config;
pub mod library;
pub mod models;
pub mod playback;
pub mod ui;

// Re-export commonly used types
pub use models::{FileFamily, Guess, ItemKind, LibraryItem};

pub use app::{App, Effect, Level, MenuItem};
pub use catalog::{Catalog, CatalogError, EpisodeQuery, ItemFilter};
pub use library::{Classifier, Library, LibraryError, ReleaseNameClassifier, ScanSummary};
pub use playback::{resolve_subtitle, SubtitleFetcher, SubtitleResolution};
