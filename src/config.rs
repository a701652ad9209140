//! Configuration management for theatre
//!
//! Config is read from `~/.config/theatre/config.toml` (or `--config PATH`)
//! and merged with command-line overrides into [`Settings`].

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::playback::PlayerType;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("No catalog database configured (set [library].db or pass --db)")]
    MissingDatabase,

    #[error("No library path configured (set [library].path or pass --library)")]
    MissingLibrary,

    #[error("Failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// On-disk configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub library: LibrarySection,
    pub tmdb: TmdbSection,
}

/// `[library]` table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibrarySection {
    /// Catalog database file
    pub db: Option<PathBuf>,
    /// Library root directory
    pub path: Option<PathBuf>,
    /// Subtitle language used for playback (e.g. "eng")
    pub sub_language: Option<String>,
    pub player: Option<PlayerType>,
    /// Scan workers; 1 scans sequentially
    pub jobs: Option<usize>,
}

/// `[tmdb]` table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TmdbSection {
    pub api_key: Option<String>,
}

impl Config {
    /// Default config file path (~/.config/theatre/config.toml)
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("theatre").join("config.toml"))
    }

    /// Load config from `explicit`, or from the default location
    ///
    /// A missing default file yields an empty config; a missing explicit
    /// file is an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => match Self::path() {
                Some(path) if path.exists() => Self::from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// TMDB key: `TMDB_API_KEY` environment variable, then the config file
    pub fn tmdb_api_key(&self) -> Option<String> {
        std::env::var("TMDB_API_KEY")
            .ok()
            .filter(|k| !k.is_empty())
            .or_else(|| self.tmdb.api_key.clone())
    }
}

/// Command-line values that take precedence over the config file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub db: Option<PathBuf>,
    pub library: Option<PathBuf>,
    pub language: Option<String>,
    pub player: Option<PlayerType>,
    pub jobs: Option<usize>,
}

/// Effective settings after merging CLI, config file and defaults
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub db: PathBuf,
    pub library: PathBuf,
    pub sub_language: Option<String>,
    pub player: PlayerType,
    pub jobs: usize,
    pub tmdb_api_key: Option<String>,
}

impl Settings {
    /// Merge overrides over the config; catalog and library paths are required
    pub fn resolve(config: &Config, overrides: Overrides) -> Result<Self, ConfigError> {
        let lib = &config.library;
        let db = overrides
            .db
            .or_else(|| lib.db.clone())
            .ok_or(ConfigError::MissingDatabase)?;
        let library = overrides
            .library
            .or_else(|| lib.path.clone())
            .ok_or(ConfigError::MissingLibrary)?;

        Ok(Self {
            db,
            library,
            sub_language: overrides
                .language
                .or_else(|| lib.sub_language.clone())
                .filter(|l| !l.trim().is_empty()),
            player: overrides.player.or(lib.player).unwrap_or_default(),
            jobs: overrides.jobs.or(lib.jobs).unwrap_or(1).max(1),
            tmdb_api_key: config.tmdb_api_key(),
        })
    }
}
