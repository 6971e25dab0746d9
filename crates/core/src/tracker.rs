//! The media tracker: the single entry point that mutates track records.
//!
//! Every operation loads the affected files from the [`MediaStore`], applies
//! the change to the in-memory aggregates and commits them together. Files
//! are detached snapshots, so nothing lingers between calls and a full
//! album re-detection holds at most one chunk of files at a time.
//!
//! The orphan policy (whether a file losing its last track becomes
//! transient) is never stored as mutable state. Unscoped calls use the
//! configured default; [`MediaTracker::begin_scope`] returns a handle whose
//! calls use an explicit policy.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::TryStreamExt;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::album::{AlbumInfo, AlbumLookup};
use crate::config::TrackingConfig;
use crate::detector::DetectorIndex;
use crate::entity::TrackableEntity;
use crate::error::TrackingError;
use crate::media_file::{MediaFile, OrphanPolicy, MEDIA_FILE_VERSION_INITIAL};
use crate::store::MediaStore;
use crate::track::{MediaTrack, TrackAction, TrackOperation};
use crate::tracked_properties::{TrackedMediaProperty, TrackedPropertyRegistry};
use crate::types::DbId;

/// Result of one batched tracking call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchOutcome {
    /// Distinct files loaded from the store.
    pub files_loaded: usize,
    /// Files written back in the commit.
    pub files_saved: usize,
    /// Actions that changed a file's track set.
    pub applied: usize,
    /// Actions that were valid but changed nothing (duplicate track, absent
    /// untrack).
    pub unchanged: usize,
    /// Actions ignored: unsaved entity, missing file, unknown album, album
    /// without detection support, or a file excluded by migration.
    pub skipped: usize,
}

/// Summary of a full album re-detection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DetectionReport {
    pub album: String,
    pub is_migration: bool,
    /// Track rows wiped before the scan (always `0` in migration mode).
    pub tracks_deleted: u64,
    /// Chunks committed.
    pub chunks: usize,
    pub tracks_detected: usize,
    pub files_saved: usize,
    /// Set when a cancellation stopped the scan early. Committed chunks stay
    /// applied.
    pub cancelled: bool,
}

pub struct MediaTracker {
    store: Arc<dyn MediaStore>,
    albums: Arc<dyn AlbumLookup>,
    properties: Arc<TrackedPropertyRegistry>,
    detectors: Arc<DetectorIndex>,
    default_policy: OrphanPolicy,
    chunk_size: usize,
}

impl MediaTracker {
    pub fn new(
        store: Arc<dyn MediaStore>,
        albums: Arc<dyn AlbumLookup>,
        detectors: Arc<DetectorIndex>,
        config: &TrackingConfig,
    ) -> Self {
        let properties = Arc::new(TrackedPropertyRegistry::new(Arc::clone(&albums)));
        Self {
            store,
            albums,
            properties,
            detectors,
            default_policy: config.orphan_policy(),
            chunk_size: config.detect_chunk_size.max(1),
        }
    }

    /// The tracked-property registry built from this tracker's albums.
    pub fn properties(&self) -> &Arc<TrackedPropertyRegistry> {
        &self.properties
    }

    pub fn default_policy(&self) -> OrphanPolicy {
        self.default_policy
    }

    /// Properties of the entity's type that reference media files.
    pub fn try_get_tracked_properties_for(
        &self,
        entity: &dyn TrackableEntity,
    ) -> Option<Arc<[TrackedMediaProperty]>> {
        self.properties.properties_for(entity)
    }

    /// A handle whose operations use the given orphan policy instead of the
    /// configured default. The tracker itself is not modified.
    pub fn begin_scope(&self, make_files_transient_when_orphaned: bool) -> TrackerScope<'_> {
        TrackerScope {
            tracker: self,
            policy: OrphanPolicy::from_flag(make_files_transient_when_orphaned),
        }
    }

    fn default_scope(&self) -> TrackerScope<'_> {
        TrackerScope {
            tracker: self,
            policy: self.default_policy,
        }
    }

    pub async fn track(
        &self,
        entity: &dyn TrackableEntity,
        media_file_id: DbId,
        property: &str,
    ) -> Result<(), TrackingError> {
        self.default_scope()
            .track(entity, media_file_id, property)
            .await
    }

    pub async fn untrack(
        &self,
        entity: &dyn TrackableEntity,
        media_file_id: DbId,
        property: &str,
    ) -> Result<(), TrackingError> {
        self.default_scope()
            .untrack(entity, media_file_id, property)
            .await
    }

    pub async fn track_many(
        &self,
        actions: impl IntoIterator<Item = TrackAction>,
    ) -> Result<BatchOutcome, TrackingError> {
        self.default_scope().track_many(actions).await
    }

    pub async fn track_many_in_album(
        &self,
        album_name: &str,
        actions: impl IntoIterator<Item = TrackAction>,
        is_migration: bool,
    ) -> Result<BatchOutcome, TrackingError> {
        self.default_scope()
            .track_many_in_album(album_name, actions, is_migration)
            .await
    }

    /// Delete every track of `album_name` in one set-based statement.
    pub async fn delete_all_tracks(&self, album_name: &str) -> Result<u64, TrackingError> {
        let deleted = self.store.delete_tracks_in_album(album_name).await?;
        tracing::info!(album = album_name, deleted, "Deleted all media tracks of album");
        Ok(deleted)
    }

    pub async fn detect_all_tracks(
        &self,
        album_name: &str,
        is_migration: bool,
    ) -> Result<DetectionReport, TrackingError> {
        self.default_scope()
            .detect_all_tracks(album_name, is_migration)
            .await
    }

    pub async fn detect_all_tracks_cancellable(
        &self,
        album_name: &str,
        is_migration: bool,
        cancel: &CancellationToken,
    ) -> Result<DetectionReport, TrackingError> {
        self.default_scope()
            .detect_all_tracks_cancellable(album_name, is_migration, cancel)
            .await
    }
}

impl std::fmt::Debug for MediaTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaTracker")
            .field("default_policy", &self.default_policy)
            .field("chunk_size", &self.chunk_size)
            .field("detectors", &self.detectors)
            .finish_non_exhaustive()
    }
}

/// Tracker operations bound to one orphan policy.
#[derive(Debug, Clone, Copy)]
pub struct TrackerScope<'a> {
    tracker: &'a MediaTracker,
    policy: OrphanPolicy,
}

impl<'a> TrackerScope<'a> {
    pub fn policy(&self) -> OrphanPolicy {
        self.policy
    }

    /// Record that `entity.property` references `media_file_id`.
    ///
    /// No-op for non-positive file ids, unsaved entities, missing files and
    /// albums without detection support. A file outside every album is an
    /// error.
    pub async fn track(
        &self,
        entity: &dyn TrackableEntity,
        media_file_id: DbId,
        property: &str,
    ) -> Result<(), TrackingError> {
        self.track_single(entity, media_file_id, property, TrackOperation::Track)
            .await
    }

    /// Remove the reference from `entity.property` to `media_file_id`.
    pub async fn untrack(
        &self,
        entity: &dyn TrackableEntity,
        media_file_id: DbId,
        property: &str,
    ) -> Result<(), TrackingError> {
        self.track_single(entity, media_file_id, property, TrackOperation::Untrack)
            .await
    }

    async fn track_single(
        &self,
        entity: &dyn TrackableEntity,
        media_file_id: DbId,
        property: &str,
        operation: TrackOperation,
    ) -> Result<(), TrackingError> {
        if media_file_id < 1 || entity.is_transient_record() {
            return Ok(());
        }

        let store = &self.tracker.store;
        let Some(mut file) = store.find_file(media_file_id).await? else {
            tracing::debug!(media_file_id, "Media file not found, nothing to track");
            return Ok(());
        };

        let album = self
            .tracker
            .albums
            .find_album_for_file(&file)
            .ok_or(TrackingError::UnassignedFile {
                file_id: media_file_id,
            })?;

        if !album.can_detect_tracks() {
            tracing::debug!(
                album = %album.name,
                media_file_id,
                "Album does not support track detection, skipping"
            );
            return Ok(());
        }

        let track = MediaTrack::for_entity(entity, property, media_file_id).with_album(&album.name);
        if file.apply(track, operation, self.policy) {
            store.save_files(std::slice::from_ref(&file)).await?;
        }
        Ok(())
    }

    /// Apply a batch of mixed track/untrack actions.
    ///
    /// Each distinct file is loaded once; actions are applied in input order
    /// (later actions on the same track win) and all changed files are
    /// committed together. Actions of unsaved entities are skipped, as in
    /// [`track`](Self::track).
    pub async fn track_many(
        &self,
        actions: impl IntoIterator<Item = TrackAction>,
    ) -> Result<BatchOutcome, TrackingError> {
        let actions: Vec<TrackAction> = actions.into_iter().collect();
        if actions.is_empty() {
            return Ok(BatchOutcome::default());
        }

        let (mut files, mut outcome) = self.load_files(&actions).await?;
        let mut touched = HashSet::new();
        let albums = &self.tracker.albums;

        for action in actions {
            if action.track.entity_id < 1 {
                outcome.skipped += 1;
                continue;
            }
            let Some(file) = files.get_mut(&action.media_file_id()) else {
                outcome.skipped += 1;
                continue;
            };

            let mut track = action.track;
            let album: &AlbumInfo = if track.has_album() {
                match albums.album_by_name(&track.album) {
                    Some(album) => album,
                    None => {
                        tracing::warn!(album = %track.album, "Track refers to unknown album, skipping");
                        outcome.skipped += 1;
                        continue;
                    }
                }
            } else {
                let album = albums
                    .find_album_for_file(file)
                    .ok_or(TrackingError::UnassignedFile { file_id: file.id })?;
                track.album = album.name.clone();
                album
            };

            if !album.can_detect_tracks() {
                outcome.skipped += 1;
                continue;
            }

            if file.apply(track, action.operation, self.policy) {
                touched.insert(file.id);
                outcome.applied += 1;
            } else {
                outcome.unchanged += 1;
            }
        }

        outcome.files_saved = self.save_touched(&mut files, &touched).await?;
        tracing::debug!(?outcome, "Applied media track batch");
        Ok(outcome)
    }

    /// Apply a batch whose tracks all belong to `album_name`.
    ///
    /// In migration mode only files still at the initial version stamp are
    /// processed; each of them is placed in the album folder when it has no
    /// folder and stamped as migrated, so repeated runs skip it.
    pub async fn track_many_in_album(
        &self,
        album_name: &str,
        actions: impl IntoIterator<Item = TrackAction>,
        is_migration: bool,
    ) -> Result<BatchOutcome, TrackingError> {
        let album = self
            .tracker
            .albums
            .album_by_name(album_name)
            .ok_or_else(|| TrackingError::UnknownAlbum {
                album: album_name.to_string(),
            })?;

        let actions: Vec<TrackAction> = actions.into_iter().collect();
        if !album.can_detect_tracks() {
            tracing::debug!(album = album_name, "Album does not support track detection, skipping batch");
            return Ok(BatchOutcome {
                skipped: actions.len(),
                ..BatchOutcome::default()
            });
        }
        if actions.is_empty() {
            return Ok(BatchOutcome::default());
        }

        let (mut files, mut outcome) = self.load_files(&actions).await?;
        if is_migration {
            files.retain(|_, file| file.version == MEDIA_FILE_VERSION_INITIAL);
        }

        let mut touched = HashSet::new();
        for action in actions {
            if action.track.entity_id < 1 {
                outcome.skipped += 1;
                continue;
            }
            let Some(file) = files.get_mut(&action.media_file_id()) else {
                outcome.skipped += 1;
                continue;
            };
            let track = action.track.with_album(&album.name);
            if file.apply(track, action.operation, self.policy) {
                touched.insert(file.id);
                outcome.applied += 1;
            } else {
                outcome.unchanged += 1;
            }
        }

        if is_migration {
            for file in files.values_mut() {
                file.mark_migrated(album.id);
                touched.insert(file.id);
            }
        }

        outcome.files_saved = self.save_touched(&mut files, &touched).await?;
        tracing::debug!(album = album_name, is_migration, ?outcome, "Applied album track batch");
        Ok(outcome)
    }

    pub async fn detect_all_tracks(
        &self,
        album_name: &str,
        is_migration: bool,
    ) -> Result<DetectionReport, TrackingError> {
        self.detect_all_tracks_cancellable(album_name, is_migration, &CancellationToken::new())
            .await
    }

    /// Rebuild all tracks of `album_name` from its detector.
    ///
    /// Unless migrating, existing tracks of the album are wiped first. The
    /// detector's stream is consumed in chunks of the configured size and
    /// each chunk is committed on its own. `cancel` is checked before the
    /// wipe and before each chunk; chunks already committed remain applied.
    pub async fn detect_all_tracks_cancellable(
        &self,
        album_name: &str,
        is_migration: bool,
        cancel: &CancellationToken,
    ) -> Result<DetectionReport, TrackingError> {
        let tracker = self.tracker;
        let album = tracker
            .albums
            .album_by_name(album_name)
            .ok_or_else(|| TrackingError::UnknownAlbum {
                album: album_name.to_string(),
            })?;
        let detector = album
            .detector()
            .and_then(|key| tracker.detectors.get(key))
            .ok_or_else(|| TrackingError::AlbumWithoutDetector {
                album: album_name.to_string(),
            })?;

        let mut report = DetectionReport {
            album: album_name.to_string(),
            is_migration,
            ..DetectionReport::default()
        };

        if cancel.is_cancelled() {
            report.cancelled = true;
            tracing::info!(album = album_name, "Track detection cancelled before start");
            return Ok(report);
        }

        tracing::info!(album = album_name, is_migration, "Detecting all media tracks");

        if !is_migration {
            report.tracks_deleted = tracker.delete_all_tracks(album_name).await?;
        }

        let mut chunks = detector
            .detect_all_tracks(album_name)
            .try_chunks(tracker.chunk_size);

        loop {
            if cancel.is_cancelled() {
                report.cancelled = true;
                tracing::info!(album = album_name, chunks = report.chunks, "Track detection cancelled");
                break;
            }
            let Some(chunk) = chunks.try_next().await.map_err(|e| e.1)? else {
                break;
            };

            let detected = chunk.len();
            let outcome = self
                .track_many_in_album(
                    album_name,
                    chunk.into_iter().map(TrackAction::from),
                    is_migration,
                )
                .await?;

            report.chunks += 1;
            report.tracks_detected += detected;
            report.files_saved += outcome.files_saved;
            tracing::debug!(
                album = album_name,
                chunk = report.chunks,
                detected,
                files_saved = outcome.files_saved,
                "Committed track detection chunk"
            );
        }

        tracing::info!(
            album = album_name,
            chunks = report.chunks,
            tracks = report.tracks_detected,
            files = report.files_saved,
            "Media track detection finished"
        );
        Ok(report)
    }

    async fn load_files(
        &self,
        actions: &[TrackAction],
    ) -> Result<(HashMap<DbId, MediaFile>, BatchOutcome), TrackingError> {
        let mut seen = HashSet::new();
        let ids: Vec<DbId> = actions
            .iter()
            .map(TrackAction::media_file_id)
            .filter(|id| *id > 0 && seen.insert(*id))
            .collect();

        let files: HashMap<DbId, MediaFile> = self
            .tracker
            .store
            .find_files(&ids)
            .await?
            .into_iter()
            .map(|file| (file.id, file))
            .collect();

        let outcome = BatchOutcome {
            files_loaded: files.len(),
            ..BatchOutcome::default()
        };
        Ok((files, outcome))
    }

    async fn save_touched(
        &self,
        files: &mut HashMap<DbId, MediaFile>,
        touched: &HashSet<DbId>,
    ) -> Result<usize, TrackingError> {
        if touched.is_empty() {
            return Ok(0);
        }
        let mut changed: Vec<MediaFile> = touched.iter().filter_map(|id| files.remove(id)).collect();
        changed.sort_by_key(|file| file.id);
        self.tracker.store.save_files(&changed).await?;
        Ok(changed.len())
    }
}
