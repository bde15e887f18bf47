use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;

use crate::repository::{AudioCacheRepository, CachedAudio, StorageError};

use super::SqliteRepository;

#[async_trait]
impl AudioCacheRepository for SqliteRepository {
    async fn match_url(&self, url: &str) -> Result<Option<CachedAudio>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT url, content_type, bytes, cached_at
            FROM audio_cache
            WHERE url = ?1
            ",
        )
        .bind(url)
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let url: String = row
            .try_get("url")
            .map_err(|err| StorageError::Serialization(err.to_string()))?;
        let content_type: Option<String> = row
            .try_get("content_type")
            .map_err(|err| StorageError::Serialization(err.to_string()))?;
        let bytes: Vec<u8> = row
            .try_get("bytes")
            .map_err(|err| StorageError::Serialization(err.to_string()))?;
        let cached_at: DateTime<Utc> = row
            .try_get("cached_at")
            .map_err(|err| StorageError::Serialization(err.to_string()))?;

        Ok(Some(CachedAudio {
            url,
            content_type,
            bytes,
            cached_at,
        }))
    }

    async fn put(&self, audio: &CachedAudio) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO audio_cache (url, content_type, bytes, cached_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(url) DO UPDATE SET
                content_type = excluded.content_type,
                bytes = excluded.bytes,
                cached_at = excluded.cached_at
            ",
        )
        .bind(&audio.url)
        .bind(audio.content_type.as_deref())
        .bind(audio.bytes.as_slice())
        .bind(audio.cached_at)
        .execute(&self.pool)
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?;

        Ok(())
    }
}
