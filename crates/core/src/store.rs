//! Persistence port for media files and their tracks.

use async_trait::async_trait;

use crate::error::TrackingError;
use crate::media_file::MediaFile;
use crate::types::DbId;

/// Storage for [`MediaFile`] aggregates.
///
/// Loaded files are detached snapshots: callers mutate them in memory and
/// hand them back to [`save_files`](MediaStore::save_files), which writes
/// the whole set in one transaction. Nothing stays cached between calls.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Load one file with its tracks.
    async fn find_file(&self, id: DbId) -> Result<Option<MediaFile>, TrackingError>;

    /// Load every existing file among `ids` with its tracks, in one fetch.
    /// Missing ids are skipped.
    async fn find_files(&self, ids: &[DbId]) -> Result<Vec<MediaFile>, TrackingError>;

    /// Persist files (flags, folder, version and exact track set) in one
    /// transaction.
    async fn save_files(&self, files: &[MediaFile]) -> Result<(), TrackingError>;

    /// Delete every track row of `album`. Returns the number of rows removed.
    async fn delete_tracks_in_album(&self, album: &str) -> Result<u64, TrackingError>;
}
