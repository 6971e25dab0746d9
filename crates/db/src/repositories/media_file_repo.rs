//! Repository for the `media_files` table and the file aggregate.

use std::collections::HashMap;

use sqlx::PgPool;
use shopmedia_core::types::DbId;
use shopmedia_core::MediaFile;

use crate::models::media_file::{CreateMediaFile, MediaFileRow, MediaTrackRow};
use crate::repositories::MediaTrackRepo;

/// Column list for `media_files` queries.
const COLUMNS: &str = "id, folder_id, is_transient, version, created_at, updated_at";

/// Provides CRUD operations for media files.
pub struct MediaFileRepo;

impl MediaFileRepo {
    /// Register a new file. It starts transient and unmigrated.
    pub async fn create(pool: &PgPool, input: &CreateMediaFile) -> Result<MediaFileRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO media_files (folder_id) VALUES ($1) RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, MediaFileRow>(&query)
            .bind(input.folder_id)
            .fetch_one(pool)
            .await
    }

    /// Find a file row by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<MediaFileRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM media_files WHERE id = $1");
        sqlx::query_as::<_, MediaFileRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find every existing row among `ids`, ordered by ID.
    pub async fn find_by_ids(pool: &PgPool, ids: &[DbId]) -> Result<Vec<MediaFileRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM media_files WHERE id = ANY($1) ORDER BY id");
        sqlx::query_as::<_, MediaFileRow>(&query)
            .bind(ids)
            .fetch_all(pool)
            .await
    }

    /// Load files together with their tracks: one query for the rows and one
    /// for all of their tracks.
    pub async fn find_aggregates(pool: &PgPool, ids: &[DbId]) -> Result<Vec<MediaFile>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = Self::find_by_ids(pool, ids).await?;
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let row_ids: Vec<DbId> = rows.iter().map(|r| r.id).collect();
        let mut tracks: HashMap<DbId, Vec<MediaTrackRow>> = HashMap::new();
        for track in MediaTrackRepo::list_for_files(pool, &row_ids).await? {
            tracks.entry(track.media_file_id).or_default().push(track);
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let file_tracks = tracks.remove(&row.id).unwrap_or_default();
                row.into_media_file(file_tracks)
            })
            .collect())
    }

    /// Persist flags, folder, version and the track changes of every file in
    /// a single transaction.
    ///
    /// Only tracks added or removed since load are written, so tracks
    /// committed by another request in the meantime survive. A file keeps
    /// `is_transient = false` while any track row references it.
    pub async fn save_aggregates(pool: &PgPool, files: &[MediaFile]) -> Result<(), sqlx::Error> {
        if files.is_empty() {
            return Ok(());
        }
        let mut tx = pool.begin().await?;

        for file in files {
            MediaTrackRepo::apply_file_changes(&mut *tx, file).await?;

            sqlx::query(
                "UPDATE media_files SET \
                     folder_id = $2, \
                     is_transient = $3 AND NOT EXISTS ( \
                         SELECT 1 FROM media_tracks WHERE media_file_id = $1), \
                     version = $4, \
                     updated_at = NOW() \
                 WHERE id = $1",
            )
            .bind(file.id)
            .bind(file.folder_id)
            .bind(file.is_transient())
            .bind(file.version)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Transient files no longer referenced by any track, oldest first.
    pub async fn list_collectable(pool: &PgPool, limit: i64) -> Result<Vec<MediaFileRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM media_files f \
             WHERE f.is_transient \
               AND NOT EXISTS (SELECT 1 FROM media_tracks t WHERE t.media_file_id = f.id) \
             ORDER BY f.updated_at, f.id \
             LIMIT $1"
        );
        sqlx::query_as::<_, MediaFileRow>(&query)
            .bind(limit)
            .fetch_all(pool)
            .await
    }
}
