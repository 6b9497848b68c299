//! Uploaded media storage.

use async_trait::async_trait;
use sqlx::PgPool;

use emporium_core::MediaId;

use super::RepositoryError;
use crate::models::MediaRef;

/// An upload to be stored.
#[derive(Debug, Clone)]
pub struct NewMedia {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// A stored blob.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StoredMedia {
    pub id: MediaId,
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// Blob store for product images and videos.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Store a blob and return a reference to it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    async fn put(&self, media: NewMedia) -> Result<MediaRef, RepositoryError>;

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    async fn get(&self, id: MediaId) -> Result<Option<StoredMedia>, RepositoryError>;
}

/// `PostgreSQL` implementation of [`MediaStore`].
#[derive(Clone)]
pub struct PgMediaStore {
    pool: PgPool,
}

impl PgMediaStore {
    /// Create a new media store.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MediaStore for PgMediaStore {
    async fn put(&self, media: NewMedia) -> Result<MediaRef, RepositoryError> {
        let id: MediaId = sqlx::query_scalar(
            "INSERT INTO media (filename, content_type, data) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(&media.filename)
        .bind(&media.content_type)
        .bind(&media.data)
        .fetch_one(&self.pool)
        .await?;

        Ok(MediaRef {
            id,
            content_type: media.content_type,
        })
    }

    async fn get(&self, id: MediaId) -> Result<Option<StoredMedia>, RepositoryError> {
        let media = sqlx::query_as::<_, StoredMedia>(
            "SELECT id, filename, content_type, data FROM media WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(media)
    }
}
