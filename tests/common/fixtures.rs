//! Test data shared by the collection suites

#![allow(dead_code)]

use media_tracker::media::{
    ExternalRef, MediaDraft, MediaEntry, MediaKind, MediaStatus, MetadataSource, SeasonDraft,
};

/// A series draft with every optional field filled in.
pub fn full_series_draft() -> MediaDraft {
    let mut draft = MediaDraft::new(MediaKind::Series, "Dark");
    draft.status = MediaStatus::InProgress;
    draft.rating = Some(9);
    draft.poster_url = Some("https://image.tmdb.org/t/p/w342/dark.jpg".to_string());
    draft.backdrop_url = Some("https://image.tmdb.org/t/p/w780/dark.jpg".to_string());
    draft.overview = Some("A missing child sets four families on a hunt.".to_string());
    draft.notes = Some("Watch with subtitles".to_string());
    draft.review = Some("Knotty and rewarding".to_string());
    draft.release_date = Some("2017-12-01".to_string());
    draft.original_language = Some("de".to_string());
    draft.vote_average = Some(8.5);
    draft.genres = ["Drama", "Mystery", "Sci-Fi & Fantasy"]
        .iter()
        .map(|g| g.to_string())
        .collect();
    draft.external_ref = Some(ExternalRef {
        source: MetadataSource::Tmdb,
        id: "70523".to_string(),
    });
    let mut second = SeasonDraft::new(2, 8);
    second.episodes_watched = 3;
    draft.seasons = vec![SeasonDraft::new(1, 10), second];
    draft
}

/// Asserts that `entry` carries every field of `draft`.
pub fn assert_entry_matches_draft(entry: &MediaEntry, draft: &MediaDraft) {
    assert_eq!(entry.kind, draft.kind);
    assert_eq!(entry.title, draft.title);
    assert_eq!(entry.status, draft.status);
    assert_eq!(entry.rating, draft.rating);
    assert_eq!(entry.poster_url, draft.poster_url);
    assert_eq!(entry.backdrop_url, draft.backdrop_url);
    assert_eq!(entry.overview, draft.overview);
    assert_eq!(entry.notes, draft.notes);
    assert_eq!(entry.review, draft.review);
    assert_eq!(entry.release_date, draft.release_date);
    assert_eq!(entry.original_language, draft.original_language);
    assert_eq!(entry.vote_average, draft.vote_average);
    assert_eq!(entry.genres, draft.genres);
    assert_eq!(entry.external_ref, draft.external_ref);

    let mut expected = draft.seasons.clone();
    expected.sort_by_key(|s| s.season_number);
    assert_eq!(entry.seasons.len(), expected.len());
    for (season, expected) in entry.seasons.iter().zip(&expected) {
        assert_eq!(season.media_id, entry.id);
        assert_eq!(season.season_number, expected.season_number);
        assert_eq!(season.total_episodes, expected.total_episodes);
        assert_eq!(season.episodes_watched, expected.episodes_watched);
        assert_eq!(season.is_completed, expected.episodes_watched >= expected.total_episodes);
    }
}
