//! Playlist store tests over a real temporary file

use radiopulse::models::PlaylistItem;
use radiopulse::store::PlaylistStore;

fn item(date: &str, time: &str, artist: &str, title: &str) -> PlaylistItem {
    PlaylistItem {
        date: date.to_string(),
        time: time.to_string(),
        artist: artist.to_string(),
        title: title.to_string(),
        station: None,
    }
}

#[tokio::test]
async fn test_merge_persists_and_reloads() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("playlist.json");

    let store = PlaylistStore::new(&path, 0, "Melody");
    let outcome = store
        .merge(vec![
            item("20.01.2025", "10:05", "Elán", "Kaskadér"),
            item("20.01.2025", "10:01", "Team", "Severanka"),
        ])
        .await
        .unwrap();
    assert_eq!(outcome.added, 2);
    assert_eq!(outcome.total, 2);

    // a fresh store over the same file sees the merged items
    let reopened = PlaylistStore::new(&path, 0, "Melody");
    let items = reopened.load_all().await;
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].artist, "Elán");
    assert_eq!(items[0].station.as_deref(), Some("Melody"));
}

#[tokio::test]
async fn test_overlapping_scrapes_do_not_duplicate() {
    let dir = tempfile::tempdir().unwrap();
    let store = PlaylistStore::new(dir.path().join("playlist.json"), 0, "Melody");

    store
        .merge(vec![
            item("20.01.2025", "10:05", "Elán", "Kaskadér"),
            item("20.01.2025", "10:01", "Team", "Severanka"),
        ])
        .await
        .unwrap();

    // the next page overlaps the previous one, as consecutive scrapes do
    let outcome = store
        .merge(vec![
            item("20.01.2025", "10:09", "Tublatanka", "Pravda víťazí"),
            item("20.01.2025", "10:05", "Elán", "Kaskadér"),
        ])
        .await
        .unwrap();

    assert_eq!(outcome.added, 1);
    assert_eq!(outcome.total, 3);

    let items = store.load_all().await;
    assert_eq!(items[0].artist, "Tublatanka");
    assert_eq!(items.len(), 3);
}

#[tokio::test]
async fn test_same_song_at_other_time_is_new() {
    let dir = tempfile::tempdir().unwrap();
    let store = PlaylistStore::new(dir.path().join("playlist.json"), 0, "Melody");

    store
        .merge(vec![item("20.01.2025", "10:05", "Elán", "Kaskadér")])
        .await
        .unwrap();
    let outcome = store
        .merge(vec![item("20.01.2025", "16:40", "Elán", "Kaskadér")])
        .await
        .unwrap();

    assert_eq!(outcome.added, 1);
}

#[tokio::test]
async fn test_limit_keeps_newest() {
    let dir = tempfile::tempdir().unwrap();
    let store = PlaylistStore::new(dir.path().join("playlist.json"), 3, "Melody");

    for minute in 0..5 {
        store
            .merge(vec![item(
                "20.01.2025",
                &format!("10:{minute:02}"),
                "Artist",
                &format!("Song {minute}"),
            )])
            .await
            .unwrap();
    }

    let items = store.load_all().await;
    assert_eq!(items.len(), 3);
    // the newest batch is prepended, the oldest entries fall off
    assert_eq!(items[0].title, "Song 4");
    assert_eq!(items[2].title, "Song 2");
}
