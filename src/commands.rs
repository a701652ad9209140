//! CLI Command Handlers
//!
//! Each handler takes the opened library, the resolved settings and the
//! parsed command, and returns an ExitCode.

use std::io::{BufRead, Write};

use serde::Serialize;
use tracing::{error, warn};

use crate::api::TmdbClient;
use crate::cli::{ExitCode, FindCmd, Output, PlayCmd};
use crate::config::Settings;
use crate::library::{Library, ScanSummary};
use crate::models::LibraryItem;
use crate::playback::{resolve_subtitle, LocalPlayer, SubtitleClient, SubtitleFetcher};

/// Subtitle downloader, available only when a TMDB key is configured
pub fn subtitle_fetcher(settings: &Settings) -> Option<SubtitleClient> {
    settings
        .tmdb_api_key
        .as_ref()
        .map(|key| SubtitleClient::new(Some(TmdbClient::new(key.clone()))))
}

// =============================================================================
// Scan Command
// =============================================================================

#[derive(Debug, Serialize)]
struct ScanJson<'a> {
    removed: Vec<&'a str>,
    added: Vec<&'a str>,
    analyzed: usize,
    unknown: usize,
    failed: usize,
}

impl<'a> From<&'a ScanSummary> for ScanJson<'a> {
    fn from(s: &'a ScanSummary) -> Self {
        Self {
            removed: s.removed.iter().map(|i| i.file_name.as_str()).collect(),
            added: s.added.iter().map(|i| i.file_name.as_str()).collect(),
            analyzed: s.report.analyzed,
            unknown: s.report.unknown,
            failed: s.report.failed,
        }
    }
}

pub fn scan_cmd(library: &Library, settings: &Settings, output: &Output) -> ExitCode {
    output.info(format!("Scanning {}...", library.root().display()));

    match library.scan_parallel(settings.jobs) {
        Ok(summary) => {
            if output.json {
                if let Err(e) = output.print_json(&ScanJson::from(&summary)) {
                    return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
                }
            } else {
                output.line(&summary);
            }
            ExitCode::Success
        }
        Err(e) => {
            error!(error = %e, "Scan failed");
            output.error(format!("Scan failed: {}", e), ExitCode::Error)
        }
    }
}

// =============================================================================
// Find Command
// =============================================================================

pub fn find_cmd(library: &Library, cmd: &FindCmd, output: &Output) -> ExitCode {
    let items = match library.catalog().find(&cmd.filter.query()) {
        Ok(items) => items,
        Err(e) => return output.error(format!("Query failed: {}", e), ExitCode::Error),
    };

    if output.json {
        if let Err(e) = output.print_json(&items) {
            return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
        }
    } else {
        for item in &items {
            output.line(item);
        }
    }
    ExitCode::Success
}

// =============================================================================
// Play Command
// =============================================================================

pub async fn play_cmd(
    library: &Library,
    settings: &Settings,
    cmd: &PlayCmd,
    fetcher: Option<&dyn SubtitleFetcher>,
    output: &Output,
) -> ExitCode {
    let query = cmd.filter.query();
    let mut matches = match library.catalog().find(&query) {
        Ok(items) => items,
        Err(e) => return output.error(format!("Query failed: {}", e), ExitCode::Error),
    };

    let episode = match matches.len() {
        0 => {
            warn!(?query, "No episode matches");
            return output.error("No episode matches the given filters", ExitCode::NoMatch);
        }
        1 => matches.remove(0),
        _ => {
            let stdin = std::io::stdin();
            let mut stderr = std::io::stderr();
            match pick_episode(&matches, &mut stdin.lock(), &mut stderr) {
                Some(index) => matches.swap_remove(index),
                None => return output.error("No valid episode selected", ExitCode::InvalidArgs),
            }
        }
    };

    let player = LocalPlayer::new(settings.player);
    if !player.is_available().await {
        return output.error(
            format!("{} is not installed", settings.player.display_name()),
            ExitCode::PlayerFailed,
        );
    }

    let language = match settings.sub_language.clone() {
        Some(language) => language,
        None => {
            let stdin = std::io::stdin();
            prompt_language(&mut stdin.lock(), &mut std::io::stderr()).unwrap_or_default()
        }
    };
    // Without a language only subtitles already in the catalog are used
    let fetcher = fetcher.filter(|_| !language.is_empty());

    let subtitle = resolve_subtitle(library, fetcher, &episode, &language).await;
    output.info(subtitle.describe());

    output.info(format!("Playing {} in {}", episode, settings.player));
    match player
        .play_and_wait(&episode.path(), subtitle.path().as_deref())
        .await
    {
        Ok(()) => ExitCode::Success,
        Err(e) => {
            error!(error = %e, "Player failed");
            output.error(e.to_string(), ExitCode::PlayerFailed)
        }
    }
}

/// Print a numbered list of `items` and read the chosen index
///
/// Returns `None` on EOF or an answer that is not a listed number.
pub fn pick_episode<R: BufRead, W: Write>(
    items: &[LibraryItem],
    input: &mut R,
    out: &mut W,
) -> Option<usize> {
    for (i, item) in items.iter().enumerate() {
        writeln!(out, "{:>3}) {}", i + 1, item).ok()?;
    }
    write!(out, "Episode number [1-{}]: ", items.len()).ok()?;
    out.flush().ok()?;

    let mut answer = String::new();
    input.read_line(&mut answer).ok()?;
    let choice: usize = answer.trim().parse().ok()?;
    (1..=items.len()).contains(&choice).then(|| choice - 1)
}

/// Ask for a subtitle language; an empty answer means none
pub fn prompt_language<R: BufRead, W: Write>(input: &mut R, out: &mut W) -> Option<String> {
    write!(out, "Subtitle language (e.g. eng, empty for none): ").ok()?;
    out.flush().ok()?;

    let mut answer = String::new();
    input.read_line(&mut answer).ok()?;
    let answer = answer.trim();
    (!answer.is_empty()).then(|| answer.to_string())
}
