//! Read-only projections over the catalog
//!
//! Series/season/episode groupings drive the menu; `find` and `find_sub`
//! back the `find` and `play` commands.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Catalog, ItemFilter, Result};
use crate::models::{ItemKind, LibraryItem};

/// Episode lookup used by `find` and `play`; absent fields do not filter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeQuery {
    /// Case-insensitive substring of the series name
    pub title: Option<String>,
    pub season: Option<u32>,
    pub episode: Option<u32>,
}

impl EpisodeQuery {
    pub fn new(title: Option<String>, season: Option<u32>, episode: Option<u32>) -> Self {
        Self {
            title: title.filter(|t| !t.trim().is_empty()),
            season,
            episode,
        }
    }
}

impl Catalog {
    /// Distinct series names, ascending
    pub fn find_series(&self) -> Result<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT DISTINCT series FROM library_items
             WHERE series IS NOT NULL
             ORDER BY series",
        )?;
        let series = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(series)
    }

    /// Distinct seasons of one series, ascending
    pub fn find_seasons(&self, series: &str) -> Result<Vec<u32>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT DISTINCT season FROM library_items
             WHERE series = ? AND season IS NOT NULL
             ORDER BY season",
        )?;
        let seasons = stmt
            .query_map([series], |row| row.get(0))?
            .collect::<std::result::Result<Vec<u32>, _>>()?;
        Ok(seasons)
    }

    /// Episodes (not subtitles) of one season, by episode number
    pub fn find_episodes(&self, series: &str, season: u32) -> Result<Vec<LibraryItem>> {
        self.select(&ItemFilter {
            kind: Some(ItemKind::Episode),
            series: Some(series.to_string()),
            season: Some(season),
            ..ItemFilter::default()
        })
    }

    /// Episodes matching every given filter
    pub fn find(&self, query: &EpisodeQuery) -> Result<Vec<LibraryItem>> {
        let items = self.select(&ItemFilter {
            kind: Some(ItemKind::Episode),
            series_contains: query.title.clone(),
            season: query.season,
            episode_number: query.episode,
            ..ItemFilter::default()
        })?;
        debug!(results = items.len(), ?query, "Find query");
        Ok(items)
    }

    /// First subtitle recorded for the same episode as `item`
    ///
    /// Candidates are taken in catalog insertion order; `language` is not
    /// matched against anything yet.
    pub fn find_sub(&self, item: &LibraryItem, language: &str) -> Result<Option<LibraryItem>> {
        let (series, season, episode) = match (&item.series, item.season, item.episode_number) {
            (Some(series), Some(season), Some(episode)) => (series, season, episode),
            _ => return Ok(None),
        };

        let mut candidates = self.select(&ItemFilter {
            kind: Some(ItemKind::EpisodeSubtitle),
            series: Some(series.clone()),
            season: Some(season),
            episode_number: Some(episode),
            ..ItemFilter::default()
        })?;
        candidates.sort_by_key(|c| c.id);

        if candidates.len() > 1 {
            debug!(
                count = candidates.len(),
                language, "Several subtitles match, taking the first"
            );
        }
        Ok(candidates.into_iter().next())
    }
}
