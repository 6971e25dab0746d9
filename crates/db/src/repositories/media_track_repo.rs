//! Repository for the `media_tracks` table.

use sqlx::{PgConnection, PgPool};
use shopmedia_core::types::DbId;
use shopmedia_core::{MediaFile, MediaTrack};

use crate::models::media_file::{AlbumTrackCount, MediaTrackRow};

/// Column list for `media_tracks` queries.
pub(crate) const COLUMNS: &str =
    "id, media_file_id, album, entity_id, entity_name, property, created_at";

/// Provides queries and set-based writes for media tracks.
pub struct MediaTrackRepo;

impl MediaTrackRepo {
    /// All tracks of one file.
    pub async fn list_for_file(
        pool: &PgPool,
        media_file_id: DbId,
    ) -> Result<Vec<MediaTrackRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM media_tracks WHERE media_file_id = $1 ORDER BY id"
        );
        sqlx::query_as::<_, MediaTrackRow>(&query)
            .bind(media_file_id)
            .fetch_all(pool)
            .await
    }

    /// Tracks of several files in one query.
    pub async fn list_for_files(
        pool: &PgPool,
        media_file_ids: &[DbId],
    ) -> Result<Vec<MediaTrackRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM media_tracks \
             WHERE media_file_id = ANY($1) \
             ORDER BY media_file_id, id"
        );
        sqlx::query_as::<_, MediaTrackRow>(&query)
            .bind(media_file_ids)
            .fetch_all(pool)
            .await
    }

    /// Every file reference held by one entity.
    pub async fn list_for_entity(
        pool: &PgPool,
        entity_name: &str,
        entity_id: DbId,
    ) -> Result<Vec<MediaTrackRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM media_tracks \
             WHERE entity_name = $1 AND entity_id = $2 \
             ORDER BY property, media_file_id"
        );
        sqlx::query_as::<_, MediaTrackRow>(&query)
            .bind(entity_name)
            .bind(entity_id)
            .fetch_all(pool)
            .await
    }

    /// Number of tracks per album, ordered by album name.
    pub async fn count_by_album(pool: &PgPool) -> Result<Vec<AlbumTrackCount>, sqlx::Error> {
        sqlx::query_as::<_, AlbumTrackCount>(
            "SELECT album, COUNT(*) AS track_count FROM media_tracks \
             GROUP BY album ORDER BY album",
        )
        .fetch_all(pool)
        .await
    }

    /// Delete every track of `album` in one statement. Returns the number of
    /// rows removed. File rows are not touched.
    pub async fn delete_by_album(pool: &PgPool, album: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM media_tracks WHERE album = $1")
            .bind(album)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Persist the tracks added to and removed from `file` since it was
    /// loaded. Rows the snapshot never saw are left alone.
    ///
    /// Runs on the caller's connection so it can join a transaction.
    pub(crate) async fn apply_file_changes(
        conn: &mut PgConnection,
        file: &MediaFile,
    ) -> Result<(), sqlx::Error> {
        let removed = TrackColumns::from_tracks(file.removed_tracks());
        if !removed.is_empty() {
            sqlx::query(
                "DELETE FROM media_tracks \
                 WHERE media_file_id = $1 \
                   AND (album, entity_id, entity_name, property) IN ( \
                       SELECT * FROM UNNEST($2::text[], $3::bigint[], $4::text[], $5::text[]))",
            )
            .bind(file.id)
            .bind(&removed.albums)
            .bind(&removed.entity_ids)
            .bind(&removed.entity_names)
            .bind(&removed.properties)
            .execute(&mut *conn)
            .await?;
        }

        let added = TrackColumns::from_tracks(file.added_tracks());
        if !added.is_empty() {
            sqlx::query(
                "INSERT INTO media_tracks (media_file_id, album, entity_id, entity_name, property) \
                 SELECT $1::bigint, t.album, t.entity_id, t.entity_name, t.property \
                 FROM UNNEST($2::text[], $3::bigint[], $4::text[], $5::text[]) \
                      AS t(album, entity_id, entity_name, property) \
                 ON CONFLICT ON CONSTRAINT uq_media_tracks_identity DO NOTHING",
            )
            .bind(file.id)
            .bind(&added.albums)
            .bind(&added.entity_ids)
            .bind(&added.entity_names)
            .bind(&added.properties)
            .execute(&mut *conn)
            .await?;
        }

        Ok(())
    }
}

/// Track identities split into parallel arrays for `UNNEST`.
#[derive(Default)]
struct TrackColumns {
    albums: Vec<String>,
    entity_ids: Vec<DbId>,
    entity_names: Vec<String>,
    properties: Vec<String>,
}

impl TrackColumns {
    fn from_tracks<'a>(tracks: impl IntoIterator<Item = &'a MediaTrack>) -> Self {
        let mut columns = Self::default();
        for track in tracks {
            columns.albums.push(track.album.clone());
            columns.entity_ids.push(track.entity_id);
            columns.entity_names.push(track.entity_name.clone());
            columns.properties.push(track.property.clone());
        }
        columns
    }

    fn is_empty(&self) -> bool {
        self.albums.is_empty()
    }
}
