use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// A fetched audio response kept for offline replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedAudio {
    pub url: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
    pub cached_at: DateTime<Utc>,
}

impl CachedAudio {
    #[must_use]
    pub fn new(
        url: impl Into<String>,
        content_type: Option<String>,
        bytes: Vec<u8>,
        cached_at: DateTime<Utc>,
    ) -> Self {
        Self {
            url: url.into(),
            content_type,
            bytes,
            cached_at,
        }
    }
}

/// Response cache keyed by absolute URL.
#[async_trait]
pub trait AudioCacheRepository: Send + Sync {
    /// Look up a cached response for `url`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn match_url(&self, url: &str) -> Result<Option<CachedAudio>, StorageError>;

    /// Insert or replace the entry for `audio.url`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the entry cannot be stored.
    async fn put(&self, audio: &CachedAudio) -> Result<(), StorageError>;
}

/// Simple in-memory repository implementation for testing and `--no-cache` runs.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    audio: Arc<Mutex<BTreeMap<String, CachedAudio>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AudioCacheRepository for InMemoryRepository {
    async fn match_url(&self, url: &str) -> Result<Option<CachedAudio>, StorageError> {
        let guard = self
            .audio
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(url).cloned())
    }

    async fn put(&self, audio: &CachedAudio) -> Result<(), StorageError> {
        let mut guard = self
            .audio
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(audio.url.clone(), audio.clone());
        Ok(())
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub audio_cache: Arc<dyn AudioCacheRepository>,
}
