//! Stremio Subtitle Client
//!
//! Downloads episode subtitles through Stremio's public OpenSubtitles v3
//! addon. The addon is keyed by IMDB id, which is looked up on TMDB from the
//! series name stored in the catalog.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::SubtitleFetcher;
use crate::api::TmdbClient;
use crate::models::LibraryItem;

const STREMIO_URL: &str = "https://opensubtitles-v3.strem.io";

/// Subtitle client using Stremio's free public endpoint
pub struct SubtitleClient {
    base_url: String,
    client: reqwest::Client,
    tmdb: Option<TmdbClient>,
}

/// Stremio subtitle response
#[derive(Debug, Deserialize)]
struct StremioResponse {
    subtitles: Vec<StremioSubtitle>,
}

/// Single subtitle entry as listed by the addon
#[derive(Debug, Clone, Deserialize)]
pub struct StremioSubtitle {
    pub id: String,
    pub url: String,
    pub lang: String,
}

impl SubtitleClient {
    /// Create a subtitle client; without TMDB no series can be resolved
    pub fn new(tmdb: Option<TmdbClient>) -> Self {
        Self::with_base_url(STREMIO_URL, tmdb)
    }

    /// Create with custom base URL (for testing)
    pub fn with_base_url(base_url: impl Into<String>, tmdb: Option<TmdbClient>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
            tmdb,
        }
    }

    /// List subtitles for one episode of the series `imdb_id`
    ///
    /// `language` is a 3-letter code or a comma-separated list of them.
    pub async fn search_episode(
        &self,
        imdb_id: &str,
        season: u32,
        episode: u32,
        language: Option<&str>,
    ) -> Result<Vec<StremioSubtitle>> {
        let url = format!(
            "{}/subtitles/series/{}:{}:{}.json",
            self.base_url,
            normalize_imdb_id(imdb_id),
            season,
            episode
        );
        debug!(%url, "Searching subtitles");

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(anyhow!("Stremio API error: {}", response.status()));
        }
        let api_response: StremioResponse = response.json().await?;

        let langs: Vec<&str> = language
            .map(|l| l.split(',').map(|s| s.trim()).filter(|s| !s.is_empty()).collect())
            .unwrap_or_default();

        Ok(api_response
            .subtitles
            .into_iter()
            .filter(|s| langs.is_empty() || langs.iter().any(|lang| lang_matches(&s.lang, lang)))
            .collect())
    }

    /// Download a subtitle body
    pub async fn download(&self, subtitle: &StremioSubtitle) -> Result<String> {
        let response = self.client.get(&subtitle.url).send().await?;
        if !response.status().is_success() {
            return Err(anyhow!("Failed to download subtitle: {}", response.status()));
        }
        Ok(response.text().await?)
    }

    async fn series_imdb_id(&self, series: &str) -> Result<String> {
        let tmdb = self
            .tmdb
            .as_ref()
            .ok_or_else(|| anyhow!("TMDB API key not configured"))?;

        let best = tmdb
            .search_tv(series)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("No TMDB match for series '{}'", series))?;

        tmdb.imdb_id(best.id)
            .await?
            .ok_or_else(|| anyhow!("No IMDB id for '{}' (TMDB {})", best.name, best.id))
    }
}

#[async_trait]
impl SubtitleFetcher for SubtitleClient {
    async fn fetch(&self, episode: &LibraryItem, language: &str) -> Result<PathBuf> {
        let (series, season, number) = match (&episode.series, episode.season, episode.episode_number) {
            (Some(series), Some(season), Some(number)) => (series, season, number),
            _ => return Err(anyhow!("{} is not a classified episode", episode.file_name)),
        };

        let imdb_id = self.series_imdb_id(series).await?;
        let language = (!language.trim().is_empty()).then_some(language);

        let subtitle = self
            .search_episode(&imdb_id, season, number, language)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("No subtitle found for {}", episode))?;

        let content = self.download(&subtitle).await?;
        let target = subtitle_path(&episode.path(), language.unwrap_or(&subtitle.lang));
        std::fs::write(&target, content)
            .with_context(|| format!("Failed to save subtitle to {}", target.display()))?;

        info!(path = %target.display(), "Downloaded subtitle");
        Ok(target)
    }
}

/// `<episode stem>.<language>.srt` beside the episode file
pub fn subtitle_path(episode: &Path, language: &str) -> PathBuf {
    let stem = episode
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let lang = language.split(',').next().unwrap_or(language).trim();
    episode.with_file_name(format!("{}.{}.srt", stem, lang))
}

fn lang_matches(available: &str, wanted: &str) -> bool {
    available.eq_ignore_ascii_case(wanted) || available.starts_with(wanted) || wanted.starts_with(available)
}

/// Normalize IMDB ID to have "tt" prefix
fn normalize_imdb_id(imdb_id: &str) -> String {
    if imdb_id.starts_with("tt") {
        imdb_id.to_string()
    } else {
        format!("tt{}", imdb_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subtitle_path() {
        assert_eq!(
            subtitle_path(Path::new("/lib/Show/Show.S01E01.mkv"), "eng"),
            PathBuf::from("/lib/Show/Show.S01E01.eng.srt")
        );
        assert_eq!(
            subtitle_path(Path::new("/lib/a.b.mkv"), "spa, eng"),
            PathBuf::from("/lib/a.b.spa.srt")
        );
    }

    #[test]
    fn test_normalize_imdb_id() {
        assert_eq!(normalize_imdb_id("tt0306414"), "tt0306414");
        assert_eq!(normalize_imdb_id("0306414"), "tt0306414");
    }

    #[test]
    fn test_lang_matches() {
        assert!(lang_matches("eng", "ENG"));
        assert!(lang_matches("pob", "po"));
        assert!(!lang_matches("spa", "eng"));
    }
}
