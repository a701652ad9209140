//! Catalog store
//!
//! Persistent table of [`LibraryItem`] records backed by an embedded SQLite
//! file. The store handle is passed explicitly to whoever needs it; cloning a
//! [`Catalog`] shares the same connection pool.
//!
//! - `migrations` - schema versioning
//! - `queries` - read-only projections used by the CLI and the menu

pub mod migrations;
pub mod queries;

use std::path::{Path, PathBuf};
use std::time::Duration;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::functions::FunctionFlags;
use rusqlite::types::Value;
use rusqlite::{params, Connection, OptionalExtension, Row};
use thiserror::Error;
use tracing::debug;

use crate::models::{Guess, ItemKind, LibraryItem};

pub use migrations::MigrationError;
pub use queries::EpisodeQuery;

/// Connection pool over the catalog file
pub type DbPool = Pool<SqliteConnectionManager>;

/// Pooled connection checked out from a [`DbPool`]
pub type PooledConnection = r2d2::PooledConnection<SqliteConnectionManager>;

/// Catalog error types
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] MigrationError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Path is not valid UTF-8: {}", .0.display())]
    NonUtf8Path(PathBuf),
}

impl CatalogError {
    /// Whether the write collided with an existing `(root, file_name)` record
    pub fn is_duplicate(&self) -> bool {
        matches!(
            self,
            CatalogError::Database(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation
        )
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;

const ITEM_COLUMNS: &str = "id, root, file_name, kind, series, season, episode_number";

// =============================================================================
// Filters
// =============================================================================

/// Conjunctive filter over catalog records; `None` fields match everything
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemFilter {
    pub kind: Option<ItemKind>,
    /// Case-insensitive substring of `series`
    pub series_contains: Option<String>,
    /// Exact `series`
    pub series: Option<String>,
    pub season: Option<u32>,
    pub episode_number: Option<u32>,
}

impl ItemFilter {
    pub fn kind(kind: ItemKind) -> Self {
        Self {
            kind: Some(kind),
            ..Self::default()
        }
    }

    fn to_sql(&self) -> (String, Vec<Value>) {
        let mut clauses = Vec::new();
        let mut values = Vec::new();

        if let Some(kind) = self.kind {
            clauses.push("kind = ?");
            values.push(Value::Text(kind.as_str().to_string()));
        }
        if let Some(ref needle) = self.series_contains {
            clauses.push("instr(unicode_lower(series), unicode_lower(?)) > 0");
            values.push(Value::Text(needle.clone()));
        }
        if let Some(ref series) = self.series {
            clauses.push("series = ?");
            values.push(Value::Text(series.clone()));
        }
        if let Some(season) = self.season {
            clauses.push("season = ?");
            values.push(Value::Integer(season.into()));
        }
        if let Some(episode) = self.episode_number {
            clauses.push("episode_number = ?");
            values.push(Value::Integer(episode.into()));
        }

        let where_clause = if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        };
        (where_clause, values)
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// Handle to the catalog store
#[derive(Clone)]
pub struct Catalog {
    pool: DbPool,
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog")
            .field("connections", &self.pool.state().connections)
            .finish()
    }
}

impl Catalog {
    /// Open (creating if needed) the catalog file at `path` and migrate it
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let manager = SqliteConnectionManager::file(path).with_init(|conn| {
            conn.busy_timeout(Duration::from_secs(10))?;
            conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;")?;
            register_functions(conn)
        });
        let pool = Pool::builder().max_size(8).build(manager)?;

        debug!(path = %path.display(), "Opened catalog");
        Self::from_pool(pool)
    }

    /// Open a private in-memory catalog
    ///
    /// Every SQLite in-memory connection is its own database, so the pool is
    /// limited to a single long-lived connection.
    pub fn open_in_memory() -> Result<Self> {
        let manager = SqliteConnectionManager::memory().with_init(|conn| register_functions(conn));
        let pool = Pool::builder()
            .max_size(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .build(manager)?;
        Self::from_pool(pool)
    }

    fn from_pool(pool: DbPool) -> Result<Self> {
        let conn = pool.get()?;
        migrations::migrate(&conn)?;
        drop(conn);
        Ok(Self { pool })
    }

    /// Check out a connection
    pub fn conn(&self) -> Result<PooledConnection> {
        Ok(self.pool.get()?)
    }

    // -------------------------------------------------------------------------
    // Writes
    // -------------------------------------------------------------------------

    /// Insert a new unclassified record for `root`/`file_name`
    pub fn insert(&self, root: &Path, file_name: &str) -> Result<LibraryItem> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO library_items (root, file_name, kind) VALUES (?, ?, ?)",
            params![
                root_text(root)?,
                file_name,
                ItemKind::Unclassified.as_str()
            ],
        )?;

        Ok(LibraryItem {
            id: conn.last_insert_rowid(),
            root: root.to_path_buf(),
            file_name: file_name.to_string(),
            kind: ItemKind::Unclassified,
            series: None,
            season: None,
            episode_number: None,
        })
    }

    /// Delete a record, returning whether it existed
    pub fn delete(&self, id: i64) -> Result<bool> {
        let affected = self
            .conn()?
            .execute("DELETE FROM library_items WHERE id = ?", [id])?;
        Ok(affected > 0)
    }

    /// Overwrite the classification fields of a record from a classifier guess
    ///
    /// `Unknown` writes nothing. Movie guesses clear series/season/episode,
    /// episode guesses set all three. Returns the record as stored afterwards.
    pub fn apply_guess(&self, id: i64, guess: &Guess) -> Result<Option<LibraryItem>> {
        let kind = match guess.kind() {
            Some(kind) => kind,
            None => return self.get(id),
        };

        let conn = self.conn()?;
        match guess {
            Guess::Episode {
                series,
                season,
                episode,
                ..
            } => {
                conn.execute(
                    "UPDATE library_items
                     SET kind = ?, series = ?, season = ?, episode_number = ?
                     WHERE id = ?",
                    params![kind.as_str(), series, season, episode, id],
                )?;
            }
            Guess::Movie { .. } => {
                conn.execute(
                    "UPDATE library_items
                     SET kind = ?, series = NULL, season = NULL, episode_number = NULL
                     WHERE id = ?",
                    params![kind.as_str(), id],
                )?;
            }
            Guess::Unknown => {}
        }
        drop(conn);

        self.get(id)
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// Fetch a record by id
    pub fn get(&self, id: i64) -> Result<Option<LibraryItem>> {
        let conn = self.conn()?;
        let item = conn
            .query_row(
                &format!("SELECT {} FROM library_items WHERE id = ?", ITEM_COLUMNS),
                [id],
                item_from_row,
            )
            .optional()?;
        Ok(item)
    }

    /// Fetch the record describing `root`/`file_name`
    pub fn find_by_location(&self, root: &Path, file_name: &str) -> Result<Option<LibraryItem>> {
        let conn = self.conn()?;
        let item = conn
            .query_row(
                &format!(
                    "SELECT {} FROM library_items WHERE root = ? AND file_name = ?",
                    ITEM_COLUMNS
                ),
                params![root_text(root)?, file_name],
                item_from_row,
            )
            .optional()?;
        Ok(item)
    }

    /// Whether any record, under any root, carries this file name
    pub fn exists_file_name(&self, file_name: &str) -> Result<bool> {
        let conn = self.conn()?;
        let found: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM library_items WHERE file_name = ?)",
            [file_name],
            |row| row.get(0),
        )?;
        Ok(found)
    }

    /// Every record, in insertion order
    pub fn all(&self) -> Result<Vec<LibraryItem>> {
        self.query(
            &format!("SELECT {} FROM library_items ORDER BY id", ITEM_COLUMNS),
            Vec::new(),
        )
    }

    /// Records the classifier has not (successfully) tagged yet
    pub fn unclassified(&self) -> Result<Vec<LibraryItem>> {
        self.select(&ItemFilter::kind(ItemKind::Unclassified))
    }

    /// Filtered select, ordered by series, season, episode then file name
    pub fn select(&self, filter: &ItemFilter) -> Result<Vec<LibraryItem>> {
        let (where_clause, values) = filter.to_sql();
        self.query(
            &format!(
                "SELECT {} FROM library_items{}
                 ORDER BY series, season, episode_number, file_name, id",
                ITEM_COLUMNS, where_clause
            ),
            values,
        )
    }

    /// Number of records
    pub fn count(&self) -> Result<usize> {
        let conn = self.conn()?;
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM library_items", [], |row| row.get(0))?;
        Ok(n as usize)
    }

    fn query(&self, sql: &str, values: Vec<Value>) -> Result<Vec<LibraryItem>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql)?;
        let items = stmt
            .query_map(rusqlite::params_from_iter(values), item_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(items)
    }
}

/// SQL functions every catalog connection carries
///
/// SQLite's own `lower()` folds ASCII only, so series matching uses
/// `unicode_lower()` instead.
fn register_functions(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        "unicode_lower",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| Ok(ctx.get::<Option<String>>(0)?.map(|text| text.to_lowercase())),
    )
}

/// Roots are stored as text; a directory that is not UTF-8 cannot round-trip
fn root_text(root: &Path) -> Result<&str> {
    root.to_str()
        .ok_or_else(|| CatalogError::NonUtf8Path(root.to_path_buf()))
}

fn item_from_row(row: &Row<'_>) -> rusqlite::Result<LibraryItem> {
    let root: String = row.get(1)?;
    let kind: String = row.get(3)?;
    Ok(LibraryItem {
        id: row.get(0)?,
        root: PathBuf::from(root),
        file_name: row.get(2)?,
        kind: kind.parse().unwrap_or_default(),
        series: row.get(4)?,
        season: row.get(5)?,
        episode_number: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn episode(series: &str, season: u32, episode: u32, subtitle: bool) -> Guess {
        Guess::Episode {
            series: series.into(),
            season,
            episode,
            subtitle,
        }
    }

    #[test]
    fn test_insert_and_lookup() {
        let catalog = Catalog::open_in_memory().unwrap();
        let item = catalog.insert(Path::new("/lib/Show"), "Show.S01E01.mkv").unwrap();

        assert_eq!(item.kind, ItemKind::Unclassified);
        assert_eq!(catalog.count().unwrap(), 1);
        assert_eq!(catalog.get(item.id).unwrap(), Some(item.clone()));
        assert_eq!(
            catalog
                .find_by_location(Path::new("/lib/Show"), "Show.S01E01.mkv")
                .unwrap(),
            Some(item)
        );
        assert!(catalog
            .find_by_location(Path::new("/lib/Other"), "Show.S01E01.mkv")
            .unwrap()
            .is_none());
        assert!(catalog.exists_file_name("Show.S01E01.mkv").unwrap());
        assert!(!catalog.exists_file_name("Show.S01E02.mkv").unwrap());
    }

    #[test]
    fn test_same_name_under_two_roots() {
        let catalog = Catalog::open_in_memory().unwrap();
        catalog.insert(Path::new("/lib/a"), "Pilot.mkv").unwrap();
        catalog.insert(Path::new("/lib/b"), "Pilot.mkv").unwrap();
        assert_eq!(catalog.count().unwrap(), 2);

        // The natural key is enforced by the schema
        let err = catalog.insert(Path::new("/lib/a"), "Pilot.mkv").unwrap_err();
        assert!(err.is_duplicate());
    }

    #[test]
    fn test_select_folds_non_ascii_case() {
        let catalog = Catalog::open_in_memory().unwrap();
        let item = catalog.insert(Path::new("/lib"), "Elite.S01E01.mkv").unwrap();
        catalog.apply_guess(item.id, &episode("Élite", 1, 1, false)).unwrap();

        for needle in ["élite", "ÉLITE", "Élite", "lit"] {
            let found = catalog
                .select(&ItemFilter {
                    series_contains: Some(needle.into()),
                    ..ItemFilter::default()
                })
                .unwrap();
            assert_eq!(found.len(), 1, "needle {:?}", needle);
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_root_is_rejected() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let catalog = Catalog::open_in_memory().unwrap();
        let root = Path::new(OsStr::from_bytes(b"/lib/Season\xff1"));
        let err = catalog.insert(root, "Show.S01E01.mkv").unwrap_err();
        assert!(matches!(err, CatalogError::NonUtf8Path(_)));
        assert!(matches!(
            catalog.find_by_location(root, "Show.S01E01.mkv"),
            Err(CatalogError::NonUtf8Path(_))
        ));
        assert_eq!(catalog.count().unwrap(), 0);
    }

    #[test]
    fn test_delete() {
        let catalog = Catalog::open_in_memory().unwrap();
        let item = catalog.insert(Path::new("/lib"), "a.mkv").unwrap();
        assert!(catalog.delete(item.id).unwrap());
        assert!(!catalog.delete(item.id).unwrap());
        assert_eq!(catalog.count().unwrap(), 0);
    }

    #[test]
    fn test_apply_episode_guess() {
        let catalog = Catalog::open_in_memory().unwrap();
        let item = catalog.insert(Path::new("/lib"), "Show.S02E03.srt").unwrap();

        let updated = catalog
            .apply_guess(item.id, &episode("Show", 2, 3, true))
            .unwrap()
            .unwrap();
        assert_eq!(updated.kind, ItemKind::EpisodeSubtitle);
        assert_eq!(updated.series.as_deref(), Some("Show"));
        assert_eq!(updated.season, Some(2));
        assert_eq!(updated.episode_number, Some(3));
    }

    #[test]
    fn test_apply_unknown_guess_changes_nothing() {
        let catalog = Catalog::open_in_memory().unwrap();
        let item = catalog.insert(Path::new("/lib"), "Show.S02E03.mkv").unwrap();
        catalog.apply_guess(item.id, &episode("Show", 2, 3, false)).unwrap();
        let before = catalog.get(item.id).unwrap();

        let after = catalog.apply_guess(item.id, &Guess::Unknown).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_apply_movie_guess_clears_episode_fields() {
        let catalog = Catalog::open_in_memory().unwrap();
        let item = catalog.insert(Path::new("/lib"), "Heat.1995.mkv").unwrap();
        catalog.apply_guess(item.id, &episode("Heat", 1, 1, false)).unwrap();

        let movie = Guess::Movie {
            title: Some("Heat".into()),
            subtitle: false,
        };
        let updated = catalog.apply_guess(item.id, &movie).unwrap().unwrap();
        assert_eq!(updated.kind, ItemKind::Movie);
        assert_eq!(updated.series, None);
        assert_eq!(updated.season, None);
        assert_eq!(updated.episode_number, None);
    }

    #[test]
    fn test_select_filters() {
        let catalog = Catalog::open_in_memory().unwrap();
        let a = catalog.insert(Path::new("/lib"), "a.mkv").unwrap();
        let b = catalog.insert(Path::new("/lib"), "b.mkv").unwrap();
        let c = catalog.insert(Path::new("/lib"), "c.srt").unwrap();
        catalog.apply_guess(a.id, &episode("The Wire", 1, 1, false)).unwrap();
        catalog.apply_guess(b.id, &episode("Wireless", 2, 1, false)).unwrap();
        catalog.apply_guess(c.id, &episode("The Wire", 1, 1, true)).unwrap();

        let wire = catalog
            .select(&ItemFilter {
                series_contains: Some("WIRE".into()),
                ..ItemFilter::default()
            })
            .unwrap();
        assert_eq!(wire.len(), 3);

        let episodes = catalog
            .select(&ItemFilter {
                kind: Some(ItemKind::Episode),
                season: Some(1),
                ..ItemFilter::default()
            })
            .unwrap();
        assert_eq!(episodes.len(), 1);
        assert_eq!(episodes[0].file_name, "a.mkv");

        assert!(catalog.unclassified().unwrap().is_empty());
        assert_eq!(catalog.all().unwrap().len(), 3);
    }
}
