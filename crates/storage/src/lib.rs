#![forbid(unsafe_code)]

pub mod repository;
pub mod sqlite;

pub use repository::{AudioCacheRepository, CachedAudio, InMemoryRepository, Storage, StorageError};
