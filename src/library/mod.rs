//! Indexing engine
//!
//! Keeps the catalog in step with the library directory:
//! - **Prune**: drop records whose file is gone
//! - **Walk**: register every media/subtitle file not yet recorded
//! - **Classify**: run the [`Classifier`] over the records
//!
//! A full scan runs the three steps in that order. `scan_parallel` overlaps
//! the walk with classification on a small rayon pool.

pub mod classifier;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::catalog::{Catalog, CatalogError};
use crate::models::{is_media, Guess, LibraryItem};

pub use classifier::{ClassifyError, Classifier, ReleaseNameClassifier};

/// Indexing error types
#[derive(Error, Debug)]
pub enum LibraryError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("Library root not found: {}", .0.display())]
    RootMissing(PathBuf),

    #[error("Library root is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("Failed to build scan worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

pub type Result<T> = std::result::Result<T, LibraryError>;

// =============================================================================
// Reports
// =============================================================================

/// Outcome counts of a classification pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassifyReport {
    /// Records whose classification was written
    pub analyzed: usize,
    /// Records the classifier could not make sense of
    pub unknown: usize,
    /// Records whose classification raised an error
    pub failed: usize,
}

impl ClassifyReport {
    fn record(&mut self, outcome: &Classified) {
        match outcome {
            Classified::Analyzed => self.analyzed += 1,
            Classified::Unknown => self.unknown += 1,
            Classified::Failed => self.failed += 1,
        }
    }

    fn merge(&mut self, other: ClassifyReport) {
        self.analyzed += other.analyzed;
        self.unknown += other.unknown;
        self.failed += other.failed;
    }
}

/// What a full scan changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub removed: Vec<LibraryItem>,
    pub added: Vec<LibraryItem>,
    pub report: ClassifyReport,
}

impl fmt::Display for ScanSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "removed {}, added {}, analyzed {}, unknown {}, failed {}",
            self.removed.len(),
            self.added.len(),
            self.report.analyzed,
            self.report.unknown,
            self.report.failed
        )
    }
}

/// Per-record classification result
#[derive(Debug)]
enum Classified {
    Analyzed,
    Unknown,
    Failed,
}

// =============================================================================
// Library
// =============================================================================

/// A library directory bound to its catalog
pub struct Library {
    catalog: Catalog,
    root: PathBuf,
    classifier: Arc<dyn Classifier>,
    scan_lock: Mutex<()>,
}

impl Library {
    /// Library using the built-in release-name classifier
    pub fn new(catalog: Catalog, root: impl Into<PathBuf>) -> Self {
        Self::with_classifier(catalog, root, Arc::new(ReleaseNameClassifier::new()))
    }

    pub fn with_classifier(
        catalog: Catalog,
        root: impl Into<PathBuf>,
        classifier: Arc<dyn Classifier>,
    ) -> Self {
        Self {
            catalog,
            root: root.into(),
            classifier,
            scan_lock: Mutex::new(()),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    // -------------------------------------------------------------------------
    // Steps
    // -------------------------------------------------------------------------

    /// Delete every record whose backing file no longer exists
    pub fn prune_obsolete(&self) -> Result<Vec<LibraryItem>> {
        let mut removed = Vec::new();
        for item in self.catalog.all()? {
            if item.exists_on_disk() {
                continue;
            }
            if self.catalog.delete(item.id)? {
                info!("Removed {}", item);
                removed.push(item);
            }
        }
        Ok(removed)
    }

    /// Walk `root` (following symlinks) and register new media files
    ///
    /// Returns only the records created by this walk.
    pub fn scan_tree(&self, root: &Path) -> Result<Vec<LibraryItem>> {
        check_root(root)?;

        let mut added = Vec::new();
        for entry in WalkDir::new(root).follow_links(true) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some((item, true)) = self.register(entry.path())? {
                added.push(item);
            }
        }
        Ok(added)
    }

    /// Register a single file, returning its record (existing or new)
    ///
    /// `None` when the file is missing or not media-relevant.
    pub fn scan_file(&self, path: &Path) -> Result<Option<LibraryItem>> {
        if !path.is_file() {
            debug!(path = %path.display(), "Not a file, nothing to register");
            return Ok(None);
        }
        Ok(self.register(path)?.map(|(item, _)| item))
    }

    /// Run the classifier over `items`, writing back every non-unknown guess
    ///
    /// Classifier errors are logged and counted; they never stop the pass.
    pub fn classify(&self, items: &[LibraryItem]) -> Result<ClassifyReport> {
        let mut report = ClassifyReport::default();
        for item in items {
            let outcome = self.classify_one(item)?;
            report.record(&outcome);
        }
        Ok(report)
    }

    // -------------------------------------------------------------------------
    // Orchestration
    // -------------------------------------------------------------------------

    /// Prune, walk the library root, then classify every record
    pub fn scan(&self) -> Result<ScanSummary> {
        let _guard = self.lock();
        info!(root = %self.root.display(), "Scanning library");

        let removed = self.prune_obsolete()?;
        let added = self.scan_tree(&self.root)?;
        let report = self.classify(&self.catalog.all()?)?;

        let summary = ScanSummary {
            removed,
            added,
            report,
        };
        info!("Scan finished: {}", summary);
        Ok(summary)
    }

    /// Like [`Library::scan`], with classification overlapped on `jobs` workers
    ///
    /// The walker feeds a rayon pool; each discovered file is registered and
    /// classified by exactly one worker, and the call returns once every
    /// discovered file has been processed.
    pub fn scan_parallel(&self, jobs: usize) -> Result<ScanSummary> {
        if jobs <= 1 {
            return self.scan();
        }

        let _guard = self.lock();
        info!(root = %self.root.display(), jobs, "Scanning library in parallel");

        let removed = self.prune_obsolete()?;
        check_root(&self.root)?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .thread_name(|idx| format!("scan-worker-{}", idx))
            .build()?;

        let outcomes: Vec<Result<Option<(Option<LibraryItem>, Classified)>>> = pool.install(|| {
            WalkDir::new(&self.root)
                .follow_links(true)
                .into_iter()
                .par_bridge()
                .map(|entry| self.process_entry(entry))
                .collect()
        });

        let mut summary = ScanSummary {
            removed,
            ..ScanSummary::default()
        };
        for outcome in outcomes {
            if let Some((added, classified)) = outcome? {
                summary.added.extend(added);
                summary.report.record(&classified);
            }
        }

        // Records outside the walked tree still get their classification pass
        let leftovers = self.catalog.unclassified()?;
        if !leftovers.is_empty() {
            summary.report.merge(self.classify(&leftovers)?);
        }

        info!("Scan finished: {}", summary);
        Ok(summary)
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.scan_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Find or create the record for `path`; the flag is true when created
    fn register(&self, path: &Path) -> Result<Option<(LibraryItem, bool)>> {
        if !is_media(path) {
            debug!(path = %path.display(), "Skipping non-media file");
            return Ok(None);
        }
        let (dir, file_name) = match (path.parent(), path.file_name().and_then(|n| n.to_str())) {
            (Some(dir), Some(name)) => (dir, name),
            _ => {
                warn!(path = %path.display(), "Skipping file with unusable name");
                return Ok(None);
            }
        };
        // A directory reached through a symlink maps to its real location
        let root = match dir.canonicalize() {
            Ok(root) => root,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping file in unresolvable directory");
                return Ok(None);
            }
        };
        if root.to_str().is_none() {
            warn!(path = %path.display(), "Skipping file in a directory with a non-UTF-8 name");
            return Ok(None);
        }

        if let Some(existing) = self.catalog.find_by_location(&root, file_name)? {
            return Ok(Some((existing, false)));
        }
        match self.catalog.insert(&root, file_name) {
            Ok(item) => {
                info!("Found {}", item);
                Ok(Some((item, true)))
            }
            // Another worker reached the same file through a symlinked directory
            Err(e) if e.is_duplicate() => Ok(self
                .catalog
                .find_by_location(&root, file_name)?
                .map(|existing| (existing, false))),
            Err(e) => Err(e.into()),
        }
    }

    fn classify_one(&self, item: &LibraryItem) -> Result<Classified> {
        match self.classifier.guess(&item.file_name) {
            Ok(Guess::Unknown) => {
                debug!(file = %item.file_name, "Classifier made nothing of it");
                Ok(Classified::Unknown)
            }
            Ok(guess) => match self.catalog.apply_guess(item.id, &guess)? {
                Some(updated) => {
                    info!("Analyzed {}", updated);
                    Ok(Classified::Analyzed)
                }
                None => Ok(Classified::Unknown),
            },
            Err(e) => {
                warn!(file = %item.file_name, error = %e, "Failed to classify");
                Ok(Classified::Failed)
            }
        }
    }

    /// One walker entry on a pool worker: register, then classify
    fn process_entry(
        &self,
        entry: walkdir::Result<walkdir::DirEntry>,
    ) -> Result<Option<(Option<LibraryItem>, Classified)>> {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "Skipping unreadable entry");
                return Ok(None);
            }
        };
        if !entry.file_type().is_file() {
            return Ok(None);
        }
        let Some((item, created)) = self.register(entry.path())? else {
            return Ok(None);
        };

        let classified = self.classify_one(&item)?;
        Ok(Some((created.then_some(item), classified)))
    }
}

fn check_root(root: &Path) -> Result<()> {
    if !root.exists() {
        return Err(LibraryError::RootMissing(root.to_path_buf()));
    }
    if !root.is_dir() {
        return Err(LibraryError::NotADirectory(root.to_path_buf()));
    }
    Ok(())
}
