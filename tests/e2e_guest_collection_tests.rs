//! End-to-end tests for guest mode
//!
//! The guest collection lives in local storage; the backend is never needed
//! but one is running to show nothing reaches it.

mod common;

use common::{assert_entry_matches_draft, full_series_draft, TestServer};
use media_tracker::collection::{
    is_guest_id, BackendClient, Collection, StoreBackend, GUEST_DATA_KEY,
};
use media_tracker::media::{
    CollectionFilter, MediaDraft, MediaKind, MediaStatus, MediaUpdate, OwnerRef, SeasonDraft,
    SeasonUpdate,
};
use media_tracker::TrackerError;
use std::sync::Arc;

#[tokio::test]
async fn test_signed_out_collection_is_unavailable() {
    let server = TestServer::spawn().await;
    let client = server.client();

    let result = client.collection.list(&CollectionFilter::All).await;
    assert!(matches!(result, Err(TrackerError::Auth(_))));
    let result = client
        .collection
        .create(&MediaDraft::new(MediaKind::Movie, "Alien"))
        .await;
    assert!(matches!(result, Err(TrackerError::Auth(_))));
    assert_eq!(client.stored(GUEST_DATA_KEY), None);
}

#[tokio::test]
async fn test_guest_entries_live_in_local_storage() {
    let server = TestServer::spawn().await;
    let client = server.guest_client();

    let capabilities = client.collection.capabilities().unwrap();
    assert_eq!(capabilities.backend, StoreBackend::Guest);

    let entry = client
        .collection
        .create(&MediaDraft::new(MediaKind::Movie, "Alien"))
        .await
        .unwrap();
    assert!(is_guest_id(&entry.id));
    assert_eq!(entry.owner_id, OwnerRef::Guest);

    let raw = client.stored(GUEST_DATA_KEY).expect("guest data persisted");
    assert!(raw.contains("Alien"));
}

#[tokio::test]
async fn test_guest_entry_round_trips_every_field() {
    let server = TestServer::spawn().await;
    let client = server.guest_client();
    let draft = full_series_draft();

    let created = client.collection.create(&draft).await.unwrap();
    assert_entry_matches_draft(&created, &draft);

    let fetched = client.collection.get(&created.id).await.unwrap();
    assert_entry_matches_draft(&fetched, &draft);
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn test_guest_list_is_newest_first() {
    let server = TestServer::spawn().await;
    let client = server.guest_client();

    for title in ["First", "Second", "Third"] {
        client
            .collection
            .create(&MediaDraft::new(MediaKind::Comic, title))
            .await
            .unwrap();
    }
    let titles: Vec<String> = client
        .collection
        .list(&CollectionFilter::All)
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.title)
        .collect();
    assert_eq!(titles, vec!["Third", "Second", "First"]);
}

#[tokio::test]
async fn test_guest_season_progress_survives_reload() {
    let server = TestServer::spawn().await;
    let client = server.guest_client();

    let mut draft = MediaDraft::new(MediaKind::Series, "Severance");
    draft.seasons = vec![SeasonDraft::new(1, 9)];
    let entry = client.collection.create(&draft).await.unwrap();
    let season_id = entry.seasons[0].id.clone();
    client.collection.adjust_episodes(&season_id, 4).await.unwrap();

    // A fresh facade over the same storage stands in for a page reload.
    let backend = Arc::new(BackendClient::new(&server.base_url).unwrap());
    let reloaded = Collection::new(client.storage.clone(), backend);
    let entry = reloaded.get(&entry.id).await.unwrap();
    assert_eq!(entry.seasons[0].episodes_watched, 4);

    let season = reloaded.adjust_episodes(&season_id, 50).await.unwrap();
    assert_eq!(season.episodes_watched, 9);
    assert!(season.is_completed);

    let update = SeasonUpdate {
        total_episodes: Some(12),
        ..Default::default()
    };
    let season = reloaded.update_season(&season_id, &update).await.unwrap();
    assert_eq!(season.episodes_watched, 9);
    assert!(!season.is_completed);
}

#[tokio::test]
async fn test_guest_update_delete_and_not_found() {
    let server = TestServer::spawn().await;
    let client = server.guest_client();
    let entry = client
        .collection
        .create(&MediaDraft::new(MediaKind::Book, "Dune"))
        .await
        .unwrap();

    let update = MediaUpdate {
        status: Some(MediaStatus::Completed),
        review: Some(Some("Spice".to_string())),
        ..Default::default()
    };
    client.collection.update(&entry.id, &update).await.unwrap();
    let reviews = client
        .collection
        .list(&CollectionFilter::CompletedWithReview)
        .await
        .unwrap();
    assert_eq!(reviews.len(), 1);

    let result = client.collection.update(&entry.id, &MediaUpdate::default()).await;
    assert!(matches!(result, Err(TrackerError::Validation(_))));

    client.collection.delete(&entry.id).await.unwrap();
    let result = client.collection.delete(&entry.id).await;
    assert!(matches!(result, Err(TrackerError::NotFound(_))));
    let result = client.collection.get("guest-0-missing0").await;
    assert!(matches!(result, Err(TrackerError::NotFound(_))));
}

#[tokio::test]
async fn test_leaving_guest_mode_deletes_guest_collection() {
    let server = TestServer::spawn().await;
    let client = server.guest_client();
    client
        .collection
        .create(&MediaDraft::new(MediaKind::Movie, "Alien"))
        .await
        .unwrap();

    client.collection.session().leave_guest_mode().unwrap();
    assert_eq!(client.stored(GUEST_DATA_KEY), None);
    assert!(matches!(
        client.collection.list(&CollectionFilter::All).await,
        Err(TrackerError::Auth(_))
    ));

    client.collection.session().enter_guest_mode().unwrap();
    assert!(client
        .collection
        .list(&CollectionFilter::All)
        .await
        .unwrap()
        .is_empty());
}
