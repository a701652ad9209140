//! Data structures for the media catalog
//!
//! Shared types used across the catalog, the indexing engine and the menu:
//! - **Items**: one catalog record per media or subtitle file
//! - **Kinds**: classification tags and the file extensions behind them
//! - **Guesses**: what the classifier made of a filename

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

// =============================================================================
// File Extensions
// =============================================================================

/// Video container extensions considered part of the library
pub const VIDEO_EXTENSIONS: &[&str] = &[
    "mkv", "avi", "mp4", "m4v", "mov", "wmv", "mpg", "mpeg", "webm", "ts",
];

/// Subtitle extensions considered part of the library
pub const SUBTITLE_EXTENSIONS: &[&str] = &["srt", "sub", "ass", "ssa", "vtt"];

/// Broad family of a media-relevant file, decided by extension alone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFamily {
    Video,
    Subtitle,
}

impl FileFamily {
    /// Classify a file name or path by its extension (case-insensitive)
    pub fn of(path: impl AsRef<Path>) -> Option<Self> {
        let ext = path.as_ref().extension()?.to_str()?.to_ascii_lowercase();
        if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Some(FileFamily::Video)
        } else if SUBTITLE_EXTENSIONS.contains(&ext.as_str()) {
            Some(FileFamily::Subtitle)
        } else {
            None
        }
    }
}

/// Whether a file should be tracked in the catalog
pub fn is_media(path: impl AsRef<Path>) -> bool {
    FileFamily::of(path).is_some()
}

// =============================================================================
// Item Kind
// =============================================================================

/// Classification tag of a catalog record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    #[default]
    Unclassified,
    Movie,
    MovieSubtitle,
    Episode,
    EpisodeSubtitle,
}

impl ItemKind {
    /// Name stored in the catalog
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Unclassified => "unclassified",
            ItemKind::Movie => "movie",
            ItemKind::MovieSubtitle => "moviesubtitle",
            ItemKind::Episode => "episode",
            ItemKind::EpisodeSubtitle => "episodesubtitle",
        }
    }

    /// Episode-like kinds carry series, season and episode number
    pub fn is_episode_like(&self) -> bool {
        matches!(self, ItemKind::Episode | ItemKind::EpisodeSubtitle)
    }

    pub fn is_movie_like(&self) -> bool {
        matches!(self, ItemKind::Movie | ItemKind::MovieSubtitle)
    }

    pub fn is_subtitle(&self) -> bool {
        matches!(self, ItemKind::MovieSubtitle | ItemKind::EpisodeSubtitle)
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "unclassified" => Ok(ItemKind::Unclassified),
            "movie" => Ok(ItemKind::Movie),
            "moviesubtitle" => Ok(ItemKind::MovieSubtitle),
            "episode" => Ok(ItemKind::Episode),
            "episodesubtitle" => Ok(ItemKind::EpisodeSubtitle),
            other => Err(format!("unknown item kind: {}", other)),
        }
    }
}

// =============================================================================
// Library Item
// =============================================================================

/// One catalog record for a single media or subtitle file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryItem {
    /// Catalog row id
    pub id: i64,
    /// Directory containing the file
    pub root: PathBuf,
    /// Base name of the file within `root`
    pub file_name: String,
    pub kind: ItemKind,
    pub series: Option<String>,
    pub season: Option<u32>,
    pub episode_number: Option<u32>,
}

impl LibraryItem {
    /// Full path of the backing file
    pub fn path(&self) -> PathBuf {
        self.root.join(&self.file_name)
    }

    /// Whether the backing file is currently present on disk
    pub fn exists_on_disk(&self) -> bool {
        self.path().is_file()
    }

    /// `S01E02` style tag for episode-like records
    pub fn episode_tag(&self) -> Option<String> {
        match (self.season, self.episode_number) {
            (Some(s), Some(e)) => Some(format!("S{:02}E{:02}", s, e)),
            _ => None,
        }
    }
}

impl fmt::Display for LibraryItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ItemKind::Movie | ItemKind::MovieSubtitle => write!(f, "Movie {}", self.file_name),
            ItemKind::Episode | ItemKind::EpisodeSubtitle => write!(
                f,
                "{} {} {} {}",
                self.kind,
                self.series.as_deref().unwrap_or("?"),
                self.episode_tag().unwrap_or_else(|| "S??E??".to_string()),
                self.file_name
            ),
            ItemKind::Unclassified => write!(f, "LibraryItem {}", self.file_name),
        }
    }
}

// =============================================================================
// Classifier Guess
// =============================================================================

/// Best-effort interpretation of a filename
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Guess {
    /// Nothing recognisable; the record is left as it is
    Unknown,
    Movie {
        title: Option<String>,
        subtitle: bool,
    },
    Episode {
        series: String,
        season: u32,
        episode: u32,
        subtitle: bool,
    },
}

impl Guess {
    /// Kind a record takes when this guess is applied, `None` for `Unknown`
    pub fn kind(&self) -> Option<ItemKind> {
        match self {
            Guess::Unknown => None,
            Guess::Movie { subtitle: false, .. } => Some(ItemKind::Movie),
            Guess::Movie { subtitle: true, .. } => Some(ItemKind::MovieSubtitle),
            Guess::Episode { subtitle: false, .. } => Some(ItemKind::Episode),
            Guess::Episode { subtitle: true, .. } => Some(ItemKind::EpisodeSubtitle),
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Guess::Unknown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(kind: ItemKind) -> LibraryItem {
        LibraryItem {
            id: 1,
            root: PathBuf::from("/lib/Show"),
            file_name: "Show.S01E02.mkv".into(),
            kind,
            series: Some("Show".into()),
            season: Some(1),
            episode_number: Some(2),
        }
    }

    #[test]
    fn test_file_family_by_extension() {
        assert_eq!(FileFamily::of("a.mkv"), Some(FileFamily::Video));
        assert_eq!(FileFamily::of("a.AVI"), Some(FileFamily::Video));
        assert_eq!(FileFamily::of("a.Srt"), Some(FileFamily::Subtitle));
        assert_eq!(FileFamily::of("a.sub"), Some(FileFamily::Subtitle));
        assert_eq!(FileFamily::of("a.nfo"), None);
        assert_eq!(FileFamily::of("README"), None);
        assert!(is_media("/x/y/z.mkv"));
        assert!(!is_media("/x/y/z.jpg"));
    }

    #[test]
    fn test_item_kind_roundtrip_names() {
        for kind in [
            ItemKind::Unclassified,
            ItemKind::Movie,
            ItemKind::MovieSubtitle,
            ItemKind::Episode,
            ItemKind::EpisodeSubtitle,
        ] {
            assert_eq!(kind.as_str().parse::<ItemKind>().unwrap(), kind);
        }
        assert!("tvshow".parse::<ItemKind>().is_err());
    }

    #[test]
    fn test_item_path_is_derived() {
        let i = item(ItemKind::Episode);
        assert_eq!(i.path(), PathBuf::from("/lib/Show/Show.S01E02.mkv"));
    }

    #[test]
    fn test_item_display() {
        assert_eq!(
            item(ItemKind::Episode).to_string(),
            "episode Show S01E02 Show.S01E02.mkv"
        );
        assert_eq!(
            item(ItemKind::Movie).to_string(),
            "Movie Show.S01E02.mkv"
        );
        assert_eq!(
            item(ItemKind::Unclassified).to_string(),
            "LibraryItem Show.S01E02.mkv"
        );
    }

    #[test]
    fn test_guess_kind() {
        assert_eq!(Guess::Unknown.kind(), None);
        let sub = Guess::Episode {
            series: "Show".into(),
            season: 1,
            episode: 1,
            subtitle: true,
        };
        assert_eq!(sub.kind(), Some(ItemKind::EpisodeSubtitle));
        let movie = Guess::Movie {
            title: None,
            subtitle: false,
        };
        assert_eq!(movie.kind(), Some(ItemKind::Movie));
    }
}
