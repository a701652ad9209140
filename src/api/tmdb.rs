//! TMDB (The Movie Database) API client
//!
//! Only the two lookups subtitle acquisition needs: find a TV series by name
//! and resolve its IMDB id.
//! API docs: https://developer.themoviedb.org/docs

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

const TMDB_URL: &str = "https://api.themoviedb.org/3";

/// Attempts per request while TMDB keeps answering 429
const MAX_ATTEMPTS: u32 = 3;

#[derive(Error, Debug)]
pub enum TmdbError {
    #[error("TMDB has no such resource")]
    NotFound,

    #[error("TMDB rate limit still hit after {0} attempts")]
    RateLimited(u32),

    #[error("TMDB answered with HTTP {0}")]
    Status(u16),

    #[error("Unexpected TMDB payload: {0}")]
    Decode(#[source] serde_json::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// A TV series as returned by a TMDB search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TvMatch {
    pub id: u64,
    pub name: String,
    pub year: Option<u16>,
}

/// Minimal TMDB v3 client for series lookups
pub struct TmdbClient {
    token: String,
    base_url: String,
    http: reqwest::Client,
}

impl TmdbClient {
    /// Client authenticating with a TMDB read access token
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_base_url(token, TMDB_URL)
    }

    /// Create a client with a custom base URL (for testing)
    pub fn with_base_url(token: impl Into<String>, base_url: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self {
            token: token.into(),
            base_url: base_url.into(),
            http,
        }
    }

    /// GET `endpoint` and decode the JSON body, backing off on 429
    async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, TmdbError> {
        let url = format!("{}{}", self.base_url, endpoint);

        for attempt in 1..=MAX_ATTEMPTS {
            let response = self
                .http
                .get(&url)
                .bearer_auth(&self.token)
                .header(reqwest::header::ACCEPT, "application/json")
                .send()
                .await?;

            match response.status() {
                StatusCode::OK => {
                    let body = response.bytes().await?;
                    return serde_json::from_slice(&body).map_err(TmdbError::Decode);
                }
                StatusCode::NOT_FOUND => return Err(TmdbError::NotFound),
                StatusCode::TOO_MANY_REQUESTS if attempt < MAX_ATTEMPTS => {
                    let delay = retry_after(&response).unwrap_or(1 << attempt);
                    debug!(delay, attempt, "TMDB rate limited, backing off");
                    tokio::time::sleep(Duration::from_secs(delay)).await;
                }
                StatusCode::TOO_MANY_REQUESTS => break,
                status => return Err(TmdbError::Status(status.as_u16())),
            }
        }
        Err(TmdbError::RateLimited(MAX_ATTEMPTS))
    }

    /// Search TV series by name, best match first
    pub async fn search_tv(&self, name: &str) -> Result<Vec<TvMatch>, TmdbError> {
        let endpoint = format!("/search/tv?query={}&page=1", urlencoding::encode(name));
        let response: SearchResponse = self.get(&endpoint).await?;
        Ok(response
            .results
            .into_iter()
            .map(|r| TvMatch {
                id: r.id,
                name: r.name,
                year: r.first_air_date.as_deref().and_then(extract_year),
            })
            .collect())
    }

    /// IMDB id (`tt...`) of a TV series, if TMDB knows it
    pub async fn imdb_id(&self, tv_id: u64) -> Result<Option<String>, TmdbError> {
        let endpoint = format!("/tv/{}/external_ids", tv_id);
        let ids: ExternalIds = self.get(&endpoint).await?;
        Ok(ids.imdb_id.filter(|id| !id.is_empty()))
    }
}

// =============================================================================
// Response Structures (internal deserialization)
// =============================================================================

#[derive(Debug, Deserialize)]
struct SearchResponse {
    results: Vec<TvRaw>,
}

#[derive(Debug, Deserialize)]
struct TvRaw {
    id: u64,
    name: String,
    first_air_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ExternalIds {
    imdb_id: Option<String>,
}

/// Seconds requested by a `Retry-After` header
fn retry_after(response: &reqwest::Response) -> Option<u64> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

/// Year of a TMDB date such as "2022-03-04"
fn extract_year(date: &str) -> Option<u16> {
    date.get(..4).and_then(|y| y.parse().ok())
}
