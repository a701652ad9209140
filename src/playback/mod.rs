//! Playback plumbing
//!
//! - Player: mpv/VLC launched as a child process
//! - Subtitles: on-demand download through TMDB + Stremio
//!
//! [`resolve_subtitle`] is shared by the `play` command and the menu.

pub mod player;
pub mod subtitles;

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::library::Library;
use crate::models::LibraryItem;

pub use player::{LocalPlayer, PlayerError, PlayerType};
pub use subtitles::SubtitleClient;

/// Source of subtitle files for episodes missing one
#[async_trait]
pub trait SubtitleFetcher: Send + Sync {
    /// Save a subtitle for `episode` on disk and return its path
    async fn fetch(&self, episode: &LibraryItem, language: &str) -> anyhow::Result<PathBuf>;
}

/// How a subtitle was obtained for playback
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubtitleResolution {
    /// Already in the catalog
    Found(LibraryItem),
    /// Downloaded and registered just now
    Downloaded(LibraryItem),
    /// Play without subtitles
    Missing,
}

impl SubtitleResolution {
    pub fn path(&self) -> Option<PathBuf> {
        match self {
            SubtitleResolution::Found(item) | SubtitleResolution::Downloaded(item) => {
                Some(item.path())
            }
            SubtitleResolution::Missing => None,
        }
    }

    /// Short status line for the menu
    pub fn describe(&self) -> String {
        match self {
            SubtitleResolution::Found(item) => format!("subtitle: {}", item.file_name),
            SubtitleResolution::Downloaded(item) => format!("downloaded subtitle: {}", item.file_name),
            SubtitleResolution::Missing => "no subtitle found".to_string(),
        }
    }
}

/// Find a subtitle for `episode`, downloading one if the catalog has none
///
/// A downloaded file is registered and classified, then looked up again
/// exactly once. Every failure along the way degrades to `Missing`.
pub async fn resolve_subtitle(
    library: &Library,
    fetcher: Option<&dyn SubtitleFetcher>,
    episode: &LibraryItem,
    language: &str,
) -> SubtitleResolution {
    let catalog = library.catalog();
    match catalog.find_sub(episode, language) {
        Ok(Some(sub)) => return SubtitleResolution::Found(sub),
        Ok(None) => {}
        Err(e) => {
            warn!(error = %e, "Subtitle lookup failed");
            return SubtitleResolution::Missing;
        }
    }

    let Some(fetcher) = fetcher else {
        debug!("No subtitle fetcher configured");
        return SubtitleResolution::Missing;
    };

    let path = match fetcher.fetch(episode, language).await {
        Ok(path) => path,
        Err(e) => {
            warn!(error = %e, episode = %episode, "Subtitle acquisition failed");
            return SubtitleResolution::Missing;
        }
    };

    let registered = match library.scan_file(&path) {
        Ok(Some(item)) => item,
        Ok(None) => {
            warn!(path = %path.display(), "Downloaded subtitle is not a usable file");
            return SubtitleResolution::Missing;
        }
        Err(e) => {
            warn!(error = %e, "Failed to register downloaded subtitle");
            return SubtitleResolution::Missing;
        }
    };
    if let Err(e) = library.classify(std::slice::from_ref(&registered)) {
        warn!(error = %e, "Failed to classify downloaded subtitle");
        return SubtitleResolution::Missing;
    }

    match catalog.find_sub(episode, language) {
        Ok(Some(sub)) => SubtitleResolution::Downloaded(sub),
        Ok(None) => {
            warn!(path = %path.display(), "Downloaded subtitle does not match the episode");
            SubtitleResolution::Missing
        }
        Err(e) => {
            warn!(error = %e, "Subtitle lookup failed");
            SubtitleResolution::Missing
        }
    }
}
