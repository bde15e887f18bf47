use chrono::{Duration, TimeZone, Utc};
use storage::repository::{AudioCacheRepository, CachedAudio, Storage};
use storage::sqlite::SqliteRepository;

fn audio(url: &str, bytes: &[u8]) -> CachedAudio {
    CachedAudio::new(
        url,
        Some("audio/mpeg".to_string()),
        bytes.to_vec(),
        Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
    )
}

#[tokio::test]
async fn sqlite_roundtrip_keeps_bytes_and_metadata() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_audio_roundtrip?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let entry = audio("http://127.0.0.1:5000/api/audio/001_gt.mp3", &[0xFF, 0xFB, 0x90, 0x00]);
    repo.put(&entry).await.unwrap();

    let fetched = repo
        .match_url(&entry.url)
        .await
        .expect("match")
        .expect("cached entry");
    assert_eq!(fetched, entry);

    assert!(
        repo.match_url("http://127.0.0.1:5000/api/audio/001_methodA.mp3")
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn sqlite_put_overwrites_by_url() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_audio_overwrite?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let url = "http://h/api/audio/002_prompt.mp3";
    repo.put(&audio(url, b"old")).await.unwrap();
    let mut newer = audio(url, b"new");
    newer.cached_at += Duration::minutes(5);
    newer.content_type = None;
    repo.put(&newer).await.unwrap();

    let fetched = repo.match_url(url).await.unwrap().unwrap();
    assert_eq!(fetched.bytes, b"new");
    assert_eq!(fetched.content_type, None);
    assert_eq!(fetched.cached_at, newer.cached_at);

    repo.put(&audio("http://h/api/audio/001_gt.mp3", b"x")).await.unwrap();
    let other = repo.match_url("http://h/api/audio/001_gt.mp3").await.unwrap().unwrap();
    assert_eq!(other.bytes, b"x");
    assert_eq!(repo.match_url(url).await.unwrap().unwrap().bytes, b"new");
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_audio_migrate?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("first migrate");
    repo.migrate().await.expect("second migrate");

    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM schema_migrations")
        .fetch_one(repo.pool())
        .await
        .unwrap();
    assert_eq!(applied, 1);
}

#[tokio::test]
async fn storage_sqlite_wires_audio_cache() {
    let storage = Storage::sqlite("sqlite:file:memdb_audio_storage?mode=memory&cache=shared")
        .await
        .expect("storage");
    storage
        .audio_cache
        .put(&audio("http://h/a.mp3", b"abc"))
        .await
        .unwrap();
    assert!(storage.audio_cache.match_url("http://h/a.mp3").await.unwrap().is_some());
}
