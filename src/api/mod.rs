//! API clients for external services
//!
//! - TMDB: series lookup and IMDB ids for subtitle search

pub mod tmdb;

pub use tmdb::{TmdbClient, TvMatch};
