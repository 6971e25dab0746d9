//! [`MediaStore`] backed by Postgres.

use async_trait::async_trait;
use shopmedia_core::types::DbId;
use shopmedia_core::{MediaFile, MediaStore, TrackingError};
use sqlx::PgPool;

use crate::repositories::{MediaFileRepo, MediaTrackRepo};

#[derive(Debug, Clone)]
pub struct PgMediaStore {
    pool: PgPool,
}

impl PgMediaStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl MediaStore for PgMediaStore {
    async fn find_file(&self, id: DbId) -> Result<Option<MediaFile>, TrackingError> {
        let mut files = MediaFileRepo::find_aggregates(&self.pool, &[id])
            .await
            .map_err(TrackingError::store)?;
        Ok(files.pop())
    }

    async fn find_files(&self, ids: &[DbId]) -> Result<Vec<MediaFile>, TrackingError> {
        MediaFileRepo::find_aggregates(&self.pool, ids)
            .await
            .map_err(TrackingError::store)
    }

    async fn save_files(&self, files: &[MediaFile]) -> Result<(), TrackingError> {
        MediaFileRepo::save_aggregates(&self.pool, files)
            .await
            .map_err(TrackingError::store)?;
        tracing::debug!(files = files.len(), "Saved media files");
        Ok(())
    }

    async fn delete_tracks_in_album(&self, album: &str) -> Result<u64, TrackingError> {
        MediaTrackRepo::delete_by_album(&self.pool, album)
            .await
            .map_err(TrackingError::store)
    }
}
