//! Media file and media track models.

use serde::{Deserialize, Serialize};
use shopmedia_core::types::{DbId, Timestamp};
use shopmedia_core::{MediaFile, MediaTrack};
use sqlx::FromRow;

// ---------------------------------------------------------------------------
// Entity structs (database rows)
// ---------------------------------------------------------------------------

/// A row from the `media_files` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MediaFileRow {
    pub id: DbId,
    pub folder_id: Option<DbId>,
    pub is_transient: bool,
    pub version: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl MediaFileRow {
    /// Assemble the aggregate from this row and its track rows.
    pub fn into_media_file(self, tracks: impl IntoIterator<Item = MediaTrackRow>) -> MediaFile {
        MediaFile::from_parts(
            self.id,
            self.folder_id,
            self.version,
            self.is_transient,
            tracks.into_iter().map(MediaTrack::from),
        )
    }
}

/// A row from the `media_tracks` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MediaTrackRow {
    pub id: DbId,
    pub media_file_id: DbId,
    pub album: String,
    pub entity_id: DbId,
    pub entity_name: String,
    pub property: String,
    pub created_at: Timestamp,
}

impl From<MediaTrackRow> for MediaTrack {
    fn from(row: MediaTrackRow) -> Self {
        MediaTrack::new(
            row.entity_name,
            row.entity_id,
            row.property,
            row.media_file_id,
            row.album,
        )
    }
}

/// Track count of one album.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AlbumTrackCount {
    pub album: String,
    pub track_count: i64,
}

// ---------------------------------------------------------------------------
// DTOs (request payloads)
// ---------------------------------------------------------------------------

/// DTO for registering an uploaded file. New files start transient.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateMediaFile {
    pub folder_id: Option<DbId>,
}
