//! Release-name classification
//!
//! Turns a file name such as `The.Wire.S01E02.720p.mkv` into a [`Guess`].
//! The engine only sees the [`Classifier`] trait, so a different guesser can
//! be plugged in without touching the scan logic.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use thiserror::Error;

use crate::models::{FileFamily, Guess};

/// Classification error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClassifyError {
    #[error("{field} number out of range: {value}")]
    NumberOutOfRange { field: &'static str, value: String },

    #[error("Classifier failed: {0}")]
    Failed(String),
}

/// Filename to metadata guesser
///
/// Implementations should return `Guess::Unknown` for names they cannot make
/// sense of and reserve `Err` for genuine failures; the engine logs errors
/// and moves on to the next item either way.
pub trait Classifier: Send + Sync {
    fn guess(&self, file_name: &str) -> Result<Guess, ClassifyError>;
}

// =============================================================================
// Patterns
// =============================================================================

// Episode markers, tried in order. Each captures the series prefix.
static EPISODE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // S01E02, s1e2, S01.E02, S01 E02
        r"(?i)^(?P<series>.*?)(?:^|[^a-z0-9])s(?P<season>\d+)[ ._-]?e(?P<episode>\d+)",
        // 1x02
        r"(?i)^(?P<series>.*?)(?:^|[^a-z0-9])(?P<season>\d{1,2})x(?P<episode>\d{1,3})(?:[^a-z0-9]|$)",
        // Season 1 Episode 2
        r"(?i)^(?P<series>.*?)(?:^|[^a-z0-9])season[ ._-]*(?P<season>\d+)[ ._-]*episode[ ._-]*(?P<episode>\d+)",
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

static MOVIE_YEAR: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^(?P<title>.*?)[ ._\-\(\[]*(?:19|20)\d{2}(?:[^0-9]|$)").ok());

// =============================================================================
// Release Name Classifier
// =============================================================================

/// Regex-based classifier for scene/release style names
#[derive(Debug, Clone, Copy, Default)]
pub struct ReleaseNameClassifier;

impl ReleaseNameClassifier {
    pub fn new() -> Self {
        Self
    }

    fn episode(stem: &str, subtitle: bool) -> Result<Option<Guess>, ClassifyError> {
        for pattern in EPISODE_PATTERNS.iter() {
            let Some(caps) = pattern.captures(stem) else {
                continue;
            };

            let series = clean_title(caps.name("series").map_or("", |m| m.as_str()));
            let season = number(&caps, "season")?;
            let episode = number(&caps, "episode")?;

            if series.is_empty() {
                return Ok(Some(Guess::Unknown));
            }
            return Ok(Some(Guess::Episode {
                series,
                season,
                episode,
                subtitle,
            }));
        }
        Ok(None)
    }

    fn movie(stem: &str, subtitle: bool) -> Guess {
        let before_year = MOVIE_YEAR
            .as_ref()
            .and_then(|re| re.captures(stem))
            .and_then(|caps| caps.name("title"))
            .map(|m| clean_title(m.as_str()))
            .filter(|t| !t.is_empty());

        let title = before_year.unwrap_or_else(|| clean_title(stem));
        if title.is_empty() {
            return Guess::Unknown;
        }
        Guess::Movie {
            title: Some(title),
            subtitle,
        }
    }
}

impl Classifier for ReleaseNameClassifier {
    fn guess(&self, file_name: &str) -> Result<Guess, ClassifyError> {
        let path = Path::new(file_name);
        let subtitle = match FileFamily::of(path) {
            Some(FileFamily::Video) => false,
            Some(FileFamily::Subtitle) => true,
            None => return Ok(Guess::Unknown),
        };
        let stem = match path.file_stem().and_then(|s| s.to_str()) {
            Some(stem) => stem,
            None => return Ok(Guess::Unknown),
        };

        match Self::episode(stem, subtitle)? {
            Some(guess) => Ok(guess),
            None => Ok(Self::movie(stem, subtitle)),
        }
    }
}

fn number(caps: &Captures<'_>, field: &'static str) -> Result<u32, ClassifyError> {
    let raw = caps.name(field).map_or("", |m| m.as_str());
    raw.parse().map_err(|_| ClassifyError::NumberOutOfRange {
        field,
        value: raw.to_string(),
    })
}

/// Dots and underscores become spaces; separators and brackets are trimmed
fn clean_title(raw: &str) -> String {
    let spaced: String = raw
        .chars()
        .map(|c| if c == '.' || c == '_' { ' ' } else { c })
        .collect();
    spaced
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_matches(|c: char| c == '-' || c.is_whitespace() || "[](){}".contains(c))
        .to_string()
}
