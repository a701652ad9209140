//! Query layer tests
//!
//! Seeds a catalog directly through `insert` + `apply_guess` and checks the
//! groupings and filters the CLI and the menu are built on.

use std::path::Path;

use theatre::{Catalog, EpisodeQuery, Guess, ItemKind, LibraryItem};

fn episode(catalog: &Catalog, series: &str, season: u32, number: u32, subtitle: bool) -> LibraryItem {
    let ext = if subtitle { "srt" } else { "mkv" };
    let name = format!("{}.S{:02}E{:02}.{}", series.replace(' ', "."), season, number, ext);
    let item = catalog.insert(Path::new("/lib"), &name).unwrap();
    catalog
        .apply_guess(
            item.id,
            &Guess::Episode {
                series: series.to_string(),
                season,
                episode: number,
                subtitle,
            },
        )
        .unwrap()
        .unwrap()
}

fn seeded() -> Catalog {
    let catalog = Catalog::open_in_memory().unwrap();
    for (series, season, number) in [
        ("The Wire", 1, 1),
        ("The Wire", 1, 2),
        ("The Wire", 2, 1),
        ("Wire in the Blood", 1, 1),
        ("Deadwood", 3, 12),
    ] {
        episode(&catalog, series, season, number, false);
    }
    episode(&catalog, "The Wire", 1, 2, true);

    let movie = catalog.insert(Path::new("/lib"), "Heat.1995.mkv").unwrap();
    catalog
        .apply_guess(
            movie.id,
            &Guess::Movie {
                title: Some("Heat".into()),
                subtitle: false,
            },
        )
        .unwrap();
    catalog
}

#[test]
fn test_series_are_distinct_and_sorted() {
    let catalog = seeded();
    assert_eq!(
        catalog.find_series().unwrap(),
        vec!["Deadwood", "The Wire", "Wire in the Blood"]
    );
    assert_eq!(catalog.find_seasons("The Wire").unwrap(), vec![1, 2]);
    assert!(catalog.find_seasons("Nope").unwrap().is_empty());
}

#[test]
fn test_episodes_exclude_subtitles() {
    let catalog = seeded();
    let episodes = catalog.find_episodes("The Wire", 1).unwrap();
    let numbers: Vec<_> = episodes.iter().map(|e| e.episode_number).collect();
    assert_eq!(numbers, vec![Some(1), Some(2)]);
    assert!(episodes.iter().all(|e| e.kind == ItemKind::Episode));
}

#[test]
fn test_find_is_a_conjunction() {
    let catalog = seeded();

    let all = catalog.find(&EpisodeQuery::default()).unwrap();
    assert_eq!(all.len(), 5);

    let wire = catalog.find(&EpisodeQuery::new(Some("WIRE".into()), None, None)).unwrap();
    assert_eq!(wire.len(), 4);

    let queries = [
        EpisodeQuery::new(Some("wire".into()), Some(1), None),
        EpisodeQuery::new(Some("wire".into()), Some(1), Some(1)),
        EpisodeQuery::new(None, None, Some(1)),
        EpisodeQuery::new(None, Some(3), Some(12)),
    ];
    for query in queries {
        let expected: Vec<_> = all
            .iter()
            .filter(|e| {
                query.title.as_ref().map_or(true, |t| {
                    e.series
                        .as_deref()
                        .unwrap_or_default()
                        .to_lowercase()
                        .contains(&t.to_lowercase())
                })
            })
            .filter(|e| query.season.map_or(true, |s| e.season == Some(s)))
            .filter(|e| query.episode.map_or(true, |n| e.episode_number == Some(n)))
            .map(|e| e.id)
            .collect();

        let mut got: Vec<_> = catalog.find(&query).unwrap().iter().map(|e| e.id).collect();
        got.sort_unstable();
        let mut expected = expected;
        expected.sort_unstable();
        assert_eq!(got, expected, "query {:?}", query);
    }
}

#[test]
fn test_blank_title_does_not_filter() {
    let catalog = seeded();
    let query = EpisodeQuery::new(Some("  ".into()), Some(1), None);
    assert!(query.title.is_none());
    assert_eq!(catalog.find(&query).unwrap().len(), 3);
}

#[test]
fn test_find_sub_matches_same_episode() {
    let catalog = seeded();
    let episodes = catalog.find_episodes("The Wire", 1).unwrap();

    let first = &episodes[0];
    assert!(catalog.find_sub(first, "eng").unwrap().is_none());

    let second = &episodes[1];
    let sub = catalog.find_sub(second, "eng").unwrap().unwrap();
    assert_eq!(sub.kind, ItemKind::EpisodeSubtitle);
    assert_eq!(sub.episode_number, Some(2));
}

#[test]
fn test_find_sub_takes_earliest_of_several() {
    let catalog = seeded();
    let later = catalog.insert(Path::new("/lib"), "The.Wire.S01E02.eng.srt").unwrap();
    catalog
        .apply_guess(
            later.id,
            &Guess::Episode {
                series: "The Wire".into(),
                season: 1,
                episode: 2,
                subtitle: true,
            },
        )
        .unwrap();
    let target = &catalog.find_episodes("The Wire", 1).unwrap()[1];

    let sub = catalog.find_sub(target, "").unwrap().unwrap();
    assert!(sub.id < later.id);
}

#[test]
fn test_title_match_folds_accented_case() {
    let catalog = Catalog::open_in_memory().unwrap();
    episode(&catalog, "Élite", 1, 1, false);
    episode(&catalog, "Ölympia", 2, 3, false);

    for title in ["élite", "ÉLITE", "Élite"] {
        let found = catalog
            .find(&EpisodeQuery::new(Some(title.into()), None, None))
            .unwrap();
        assert_eq!(found.len(), 1, "title {:?}", title);
        assert_eq!(found[0].series.as_deref(), Some("Élite"));
    }

    let found = catalog
        .find(&EpisodeQuery::new(Some("ölym".into()), Some(2), None))
        .unwrap();
    assert_eq!(found.len(), 1);
}
