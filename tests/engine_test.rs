//! Library engine tests
//!
//! Scans real directory trees (tempfile) into a catalog and checks pruning,
//! registration and classification end to end.

use std::fs;
use std::path::Path;

use tempfile::TempDir;
use theatre::{Catalog, ItemKind, Library};

fn touch(dir: &Path, name: &str) {
    if let Some(parent) = dir.join(name).parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(dir.join(name), b"").unwrap();
}

fn library(dir: &TempDir) -> Library {
    Library::new(Catalog::open_in_memory().unwrap(), dir.path())
}

#[test]
fn test_scan_classifies_episode_and_subtitle() {
    let dir = TempDir::new().unwrap();
    touch(dir.path(), "Show.S01E01.mkv");
    touch(dir.path(), "Show.S01E01.srt");
    touch(dir.path(), "notes.txt");

    let lib = library(&dir);
    let summary = lib.scan().unwrap();

    assert_eq!(summary.added.len(), 2);
    assert!(summary.removed.is_empty());
    assert_eq!(summary.report.analyzed, 2);

    let catalog = lib.catalog();
    assert_eq!(catalog.count().unwrap(), 2);
    assert_eq!(catalog.find_series().unwrap(), vec!["Show".to_string()]);
    assert_eq!(catalog.find_seasons("Show").unwrap(), vec![1]);

    let episodes = catalog.find_episodes("Show", 1).unwrap();
    assert_eq!(episodes.len(), 1);
    assert_eq!(episodes[0].kind, ItemKind::Episode);
    assert_eq!(episodes[0].episode_number, Some(1));

    let sub = catalog.find_sub(&episodes[0], "eng").unwrap().unwrap();
    assert_eq!(sub.kind, ItemKind::EpisodeSubtitle);
    assert_eq!(sub.file_name, "Show.S01E01.srt");
}

#[test]
fn test_rescan_is_idempotent() {
    let dir = TempDir::new().unwrap();
    touch(dir.path(), "Show.S01E01.mkv");
    touch(dir.path(), "season2/Show.S02E03.avi");

    let lib = library(&dir);
    lib.scan().unwrap();
    let before = lib.catalog().all().unwrap();

    let summary = lib.scan().unwrap();
    assert!(summary.added.is_empty());
    assert!(summary.removed.is_empty());
    assert_eq!(lib.catalog().all().unwrap(), before);
}

#[test]
fn test_deleted_file_is_pruned() {
    let dir = TempDir::new().unwrap();
    touch(dir.path(), "Show.S01E01.mkv");
    touch(dir.path(), "Show.S01E02.mkv");

    let lib = library(&dir);
    lib.scan().unwrap();
    fs::remove_file(dir.path().join("Show.S01E01.mkv")).unwrap();

    let summary = lib.scan().unwrap();
    assert_eq!(summary.removed.len(), 1);
    assert_eq!(summary.removed[0].file_name, "Show.S01E01.mkv");

    for item in lib.catalog().all().unwrap() {
        assert!(item.exists_on_disk(), "{} should have been pruned", item);
    }
    let episodes = lib.catalog().find_episodes("Show", 1).unwrap();
    assert_eq!(episodes.len(), 1);
    assert_eq!(episodes[0].episode_number, Some(2));
}

#[test]
fn test_scan_missing_root_fails() {
    let dir = TempDir::new().unwrap();
    let lib = Library::new(Catalog::open_in_memory().unwrap(), dir.path().join("gone"));
    assert!(lib.scan().is_err());
}

#[test]
fn test_unrecognised_names_stay_unclassified() {
    let dir = TempDir::new().unwrap();
    touch(dir.path(), "Show.S01E01.mkv");
    touch(dir.path(), "---.mkv");

    let lib = library(&dir);
    let summary = lib.scan().unwrap();
    assert_eq!(summary.report.unknown, 1);

    let unclassified = lib.catalog().unclassified().unwrap();
    assert_eq!(unclassified.len(), 1);
    assert_eq!(unclassified[0].file_name, "---.mkv");
}

#[test]
fn test_parallel_scan_matches_sequential() {
    let dir = TempDir::new().unwrap();
    for season in 1..=3 {
        for episode in 1..=8 {
            touch(
                dir.path(),
                &format!("Show/Season {}/Show.S{:02}E{:02}.mkv", season, season, episode),
            );
        }
    }
    touch(dir.path(), "Other.1x01.mp4");

    let db = TempDir::new().unwrap();
    let parallel = Library::new(Catalog::open(db.path().join("p.sqlite")).unwrap(), dir.path());
    let summary = parallel.scan_parallel(4).unwrap();
    assert_eq!(summary.added.len(), 25);
    assert_eq!(summary.report.analyzed, 25);
    assert!(parallel.catalog().unclassified().unwrap().is_empty());

    let sequential = library(&dir);
    sequential.scan().unwrap();

    for season in 1..=3 {
        let p = parallel.catalog().find_episodes("Show", season).unwrap();
        let s = sequential.catalog().find_episodes("Show", season).unwrap();
        let numbers = |items: &[theatre::LibraryItem]| {
            items.iter().map(|i| i.episode_number).collect::<Vec<_>>()
        };
        assert_eq!(numbers(&p), numbers(&s));
    }

    let again = parallel.scan_parallel(4).unwrap();
    assert!(again.added.is_empty());
    assert_eq!(parallel.catalog().count().unwrap(), 25);
}

#[test]
fn test_scan_file_registers_once() {
    let dir = TempDir::new().unwrap();
    touch(dir.path(), "Show.S01E01.en.srt");

    let lib = library(&dir);
    let path = dir.path().join("Show.S01E01.en.srt");
    let first = lib.scan_file(&path).unwrap().unwrap();
    let second = lib.scan_file(&path).unwrap().unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(first.kind, ItemKind::Unclassified);

    assert!(lib.scan_file(&dir.path().join("missing.srt")).unwrap().is_none());
}

#[test]
fn test_subtitle_survives_deleted_episode() {
    let dir = TempDir::new().unwrap();
    touch(dir.path(), "Show.S01E01.mkv");
    touch(dir.path(), "Show.S01E01.srt");

    let lib = library(&dir);
    lib.scan().unwrap();
    fs::remove_file(dir.path().join("Show.S01E01.mkv")).unwrap();

    let summary = lib.scan().unwrap();
    assert_eq!(summary.removed.len(), 1);
    assert_eq!(summary.removed[0].file_name, "Show.S01E01.mkv");

    let left = lib.catalog().all().unwrap();
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].file_name, "Show.S01E01.srt");
    assert_eq!(left[0].kind, ItemKind::EpisodeSubtitle);
    assert!(lib.catalog().find_episodes("Show", 1).unwrap().is_empty());
}

#[test]
fn test_same_name_in_two_directories() {
    let dir = TempDir::new().unwrap();
    touch(dir.path(), "a/Pilot.mkv");
    touch(dir.path(), "b/Pilot.mkv");

    let lib = library(&dir);
    let summary = lib.scan().unwrap();
    assert_eq!(summary.added.len(), 2);

    let items = lib.catalog().all().unwrap();
    assert_eq!(items.len(), 2);
    assert_ne!(items[0].root, items[1].root);
    assert!(items.iter().all(|i| i.file_name == "Pilot.mkv"));

    assert!(lib.scan().unwrap().added.is_empty());
    assert_eq!(lib.catalog().count().unwrap(), 2);
}

#[cfg(unix)]
#[test]
fn test_symlinked_directory_is_indexed_once() {
    let dir = TempDir::new().unwrap();
    touch(dir.path(), "Show/Season 1/Show.S01E01.mkv");
    std::os::unix::fs::symlink(dir.path().join("Show/Season 1"), dir.path().join("Latest")).unwrap();

    let lib = library(&dir);
    let summary = lib.scan().unwrap();
    assert_eq!(summary.added.len(), 1);
    assert_eq!(lib.catalog().count().unwrap(), 1);

    let again = lib.scan_parallel(4).unwrap();
    assert!(again.added.is_empty());
    assert!(again.removed.is_empty());
}

#[cfg(unix)]
#[test]
fn test_non_utf8_directory_keeps_scan_idempotent() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let dir = TempDir::new().unwrap();
    let odd = dir.path().join(OsStr::from_bytes(b"Season\xff1"));
    fs::create_dir_all(&odd).unwrap();
    fs::write(odd.join("Show.S01E01.mkv"), b"").unwrap();
    touch(dir.path(), "Show.S01E02.mkv");

    let lib = library(&dir);
    let first = lib.scan().unwrap();
    assert_eq!(first.added.len(), 1);
    assert_eq!(first.added[0].file_name, "Show.S01E02.mkv");
    let before = lib.catalog().all().unwrap();

    let second = lib.scan().unwrap();
    assert!(second.removed.is_empty());
    assert!(second.added.is_empty());
    assert_eq!(lib.catalog().all().unwrap(), before);
}
