//! The media file aggregate and its transience rules.
//!
//! A file owns its track set. While at least one track exists the file is
//! never transient; once the last track goes away the active
//! [`OrphanPolicy`] decides whether the file becomes eligible for garbage
//! collection.
//!
//! A loaded file also records which tracks were added and removed since it
//! was loaded, so stores can persist the change instead of overwriting rows
//! committed by someone else in the meantime.

use std::collections::HashSet;

use serde::Serialize;

use crate::track::{MediaTrack, TrackOperation};
use crate::types::DbId;

/// Version stamp of files that have not been through track migration.
pub const MEDIA_FILE_VERSION_INITIAL: i32 = 1;

/// Version stamp written once track migration processed a file.
pub const MEDIA_FILE_VERSION_MIGRATED: i32 = 2;

/// What happens to a file whose last track was removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum OrphanPolicy {
    /// Leave `is_transient` as it is.
    #[default]
    KeepPersistent,
    /// Mark the file transient so it can be collected.
    MakeTransient,
}

impl OrphanPolicy {
    pub fn from_flag(make_files_transient_when_orphaned: bool) -> Self {
        if make_files_transient_when_orphaned {
            Self::MakeTransient
        } else {
            Self::KeepPersistent
        }
    }
}

/// Observable tracking state of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TrackState {
    Tracked,
    UntrackedPersistent,
    UntrackedTransient,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    pub id: DbId,
    pub folder_id: Option<DbId>,
    pub version: i32,
    is_transient: bool,
    tracks: HashSet<MediaTrack>,
    added: HashSet<MediaTrack>,
    removed: HashSet<MediaTrack>,
}

impl MediaFile {
    /// A freshly uploaded file: no tracks, transient, unmigrated.
    pub fn new(id: DbId, folder_id: Option<DbId>) -> Self {
        Self {
            id,
            folder_id,
            version: MEDIA_FILE_VERSION_INITIAL,
            is_transient: true,
            tracks: HashSet::new(),
            added: HashSet::new(),
            removed: HashSet::new(),
        }
    }

    /// Rebuild a file from stored state. A stored transient flag that
    /// contradicts a non-empty track set is corrected.
    pub fn from_parts(
        id: DbId,
        folder_id: Option<DbId>,
        version: i32,
        is_transient: bool,
        tracks: impl IntoIterator<Item = MediaTrack>,
    ) -> Self {
        let tracks: HashSet<MediaTrack> = tracks.into_iter().collect();
        let is_transient = is_transient && tracks.is_empty();
        Self {
            id,
            folder_id,
            version,
            is_transient,
            tracks,
            added: HashSet::new(),
            removed: HashSet::new(),
        }
    }

    pub fn is_transient(&self) -> bool {
        self.is_transient
    }

    pub fn tracks(&self) -> &HashSet<MediaTrack> {
        &self.tracks
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    pub fn state(&self) -> TrackState {
        match (self.tracks.is_empty(), self.is_transient) {
            (false, _) => TrackState::Tracked,
            (true, false) => TrackState::UntrackedPersistent,
            (true, true) => TrackState::UntrackedTransient,
        }
    }

    /// Add a track. Returns `false` if it was already present. Either way
    /// the file is no longer transient.
    pub fn add_track(&mut self, track: MediaTrack) -> bool {
        let added = !self.tracks.contains(&track);
        if added {
            if !self.removed.remove(&track) {
                self.added.insert(track.clone());
            }
            self.tracks.insert(track);
        }
        self.is_transient = false;
        added
    }

    /// Remove a track. Returns `false` if it was not present, in which case
    /// nothing changes.
    pub fn remove_track(&mut self, track: &MediaTrack, policy: OrphanPolicy) -> bool {
        if !self.tracks.remove(track) {
            return false;
        }
        if !self.added.remove(track) {
            self.removed.insert(track.clone());
        }
        if self.tracks.is_empty() && policy == OrphanPolicy::MakeTransient {
            self.is_transient = true;
        }
        true
    }

    /// Apply one operation. Returns whether the track set changed.
    pub fn apply(
        &mut self,
        track: MediaTrack,
        operation: TrackOperation,
        policy: OrphanPolicy,
    ) -> bool {
        match operation {
            TrackOperation::Track => self.add_track(track),
            TrackOperation::Untrack => self.remove_track(&track, policy),
        }
    }

    /// Tracks added since the file was loaded.
    pub fn added_tracks(&self) -> &HashSet<MediaTrack> {
        &self.added
    }

    /// Tracks removed since the file was loaded.
    pub fn removed_tracks(&self) -> &HashSet<MediaTrack> {
        &self.removed
    }

    pub fn has_track_changes(&self) -> bool {
        !self.added.is_empty() || !self.removed.is_empty()
    }

    /// Write this snapshot's row state and track changes onto `stored`.
    /// Tracks of `stored` this snapshot never saw are kept.
    pub fn merge_into(&self, stored: &mut MediaFile) {
        stored.folder_id = self.folder_id;
        stored.version = self.version;
        for track in &self.removed {
            stored.tracks.remove(track);
        }
        stored.tracks.extend(self.added.iter().cloned());
        stored.is_transient = self.is_transient && stored.tracks.is_empty();
        stored.added.clear();
        stored.removed.clear();
    }

    /// The file as a store would return it after saving: same state, no
    /// pending changes.
    pub fn into_committed(mut self) -> Self {
        self.mark_committed();
        self
    }

    /// Forget recorded changes once they have been written.
    pub fn mark_committed(&mut self) {
        self.added.clear();
        self.removed.clear();
    }

    pub fn is_migrated(&self) -> bool {
        self.version >= MEDIA_FILE_VERSION_MIGRATED
    }

    /// Stamp the file as migrated, placing it in `album_folder_id` when it
    /// has no folder yet.
    pub fn mark_migrated(&mut self, album_folder_id: DbId) {
        self.folder_id.get_or_insert(album_folder_id);
        self.version = MEDIA_FILE_VERSION_MIGRATED;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(file_id: DbId) -> MediaTrack {
        MediaTrack::new("Product", 7, "PictureId", file_id, "catalog")
    }

    #[test]
    fn new_file_is_untracked_transient() {
        let file = MediaFile::new(5, None);
        assert_eq!(file.state(), TrackState::UntrackedTransient);
        assert_eq!(file.version, MEDIA_FILE_VERSION_INITIAL);
    }

    #[test]
    fn tracking_twice_is_idempotent() {
        let mut file = MediaFile::new(5, None);
        assert!(file.add_track(track(5)));
        let after_first = file.clone();
        assert!(!file.add_track(track(5)));
        assert_eq!(file, after_first);
        assert_eq!(file.state(), TrackState::Tracked);
    }

    #[test]
    fn track_then_untrack_restores_track_set() {
        let mut file = MediaFile::from_parts(5, None, 1, false, [track(5).with_album("blog")]);
        let before = file.tracks().clone();
        file.add_track(track(5));
        file.remove_track(&track(5), OrphanPolicy::MakeTransient);
        assert_eq!(file.tracks(), &before);
        assert!(!file.is_transient());
    }

    #[test]
    fn last_removal_follows_policy() {
        let mut keep = MediaFile::from_parts(5, None, 1, false, [track(5)]);
        keep.remove_track(&track(5), OrphanPolicy::KeepPersistent);
        assert_eq!(keep.state(), TrackState::UntrackedPersistent);

        let mut collect = MediaFile::from_parts(5, None, 1, false, [track(5)]);
        collect.remove_track(&track(5), OrphanPolicy::MakeTransient);
        assert_eq!(collect.state(), TrackState::UntrackedTransient);
    }

    #[test]
    fn removing_absent_track_changes_nothing() {
        let mut file = MediaFile::from_parts(5, None, 1, false, []);
        assert!(!file.remove_track(&track(5), OrphanPolicy::MakeTransient));
        assert!(!file.is_transient());
    }

    #[test]
    fn stored_state_never_violates_invariant() {
        let file = MediaFile::from_parts(5, None, 1, true, [track(5)]);
        assert!(!file.is_transient());
    }

    #[test]
    fn invariant_holds_for_every_operation_sequence() {
        let ops = [
            (TrackOperation::Track, 1),
            (TrackOperation::Untrack, 2),
            (TrackOperation::Track, 2),
            (TrackOperation::Untrack, 1),
            (TrackOperation::Untrack, 2),
            (TrackOperation::Track, 1),
        ];
        for policy in [OrphanPolicy::KeepPersistent, OrphanPolicy::MakeTransient] {
            let mut file = MediaFile::new(5, None);
            for (op, entity_id) in ops {
                let t = MediaTrack::new("Product", entity_id, "PictureId", 5, "catalog");
                file.apply(t, op, policy);
                assert!(file.track_count() == 0 || !file.is_transient());
            }
        }
    }

    #[test]
    fn records_changes_since_load() {
        let other = MediaTrack::new("Product", 8, "PictureId", 5, "catalog");
        let mut file = MediaFile::from_parts(5, None, 1, false, [other.clone()]);
        assert!(!file.has_track_changes());

        file.add_track(track(5));
        file.remove_track(&other, OrphanPolicy::KeepPersistent);
        assert!(file.added_tracks().contains(&track(5)));
        assert!(file.removed_tracks().contains(&other));

        // Reverting both leaves nothing to persist.
        file.remove_track(&track(5), OrphanPolicy::KeepPersistent);
        file.add_track(other);
        assert!(!file.has_track_changes());
    }

    #[test]
    fn merge_keeps_tracks_committed_after_load() {
        let mut snapshot = MediaFile::from_parts(5, None, 1, false, []);
        let mut stored = snapshot.clone();
        let concurrent = MediaTrack::new("Product", 1, "PictureId", 5, "catalog");
        stored.add_track(concurrent.clone());
        let mut stored = stored.into_committed();

        snapshot.add_track(track(5));
        snapshot.merge_into(&mut stored);

        assert!(stored.tracks().contains(&concurrent));
        assert!(stored.tracks().contains(&track(5)));
        assert!(!stored.has_track_changes());
    }

    #[test]
    fn migration_keeps_existing_folder() {
        let mut unassigned = MediaFile::new(5, None);
        unassigned.mark_migrated(10);
        assert_eq!(unassigned.folder_id, Some(10));
        assert!(unassigned.is_migrated());

        let mut placed = MediaFile::new(6, Some(42));
        placed.mark_migrated(10);
        assert_eq!(placed.folder_id, Some(42));
    }
}
