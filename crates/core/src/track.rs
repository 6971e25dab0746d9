//! Track records and the operations that add or remove them.

use serde::{Deserialize, Serialize};

use crate::entity::TrackableEntity;
use crate::types::DbId;

/// A recorded reference from one entity property to one media file.
///
/// Equality and hashing cover exactly the five fields. An empty `album`
/// means the album has not been resolved yet; it is filled in from the
/// file's album before the track is applied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MediaTrack {
    pub entity_name: String,
    pub entity_id: DbId,
    pub property: String,
    pub media_file_id: DbId,
    pub album: String,
}

impl MediaTrack {
    pub fn new(
        entity_name: impl Into<String>,
        entity_id: DbId,
        property: impl Into<String>,
        media_file_id: DbId,
        album: impl Into<String>,
    ) -> Self {
        Self {
            entity_name: entity_name.into(),
            entity_id,
            property: property.into(),
            media_file_id,
            album: album.into(),
        }
    }

    /// A track for `entity` with the album left unresolved.
    pub fn for_entity(entity: &dyn TrackableEntity, property: &str, media_file_id: DbId) -> Self {
        Self::new(
            entity.entity_name(),
            entity.entity_id(),
            property,
            media_file_id,
            String::new(),
        )
    }

    pub fn has_album(&self) -> bool {
        !self.album.is_empty()
    }

    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = album.into();
        self
    }

    pub fn track(self) -> TrackAction {
        TrackAction::new(self, TrackOperation::Track)
    }

    pub fn untrack(self) -> TrackAction {
        TrackAction::new(self, TrackOperation::Untrack)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackOperation {
    Track,
    Untrack,
}

/// A track paired with the operation to perform on it. The operation is not
/// part of the track's identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackAction {
    pub track: MediaTrack,
    pub operation: TrackOperation,
}

impl TrackAction {
    pub fn new(track: MediaTrack, operation: TrackOperation) -> Self {
        Self { track, operation }
    }

    pub fn media_file_id(&self) -> DbId {
        self.track.media_file_id
    }
}

impl From<MediaTrack> for TrackAction {
    /// Detector output is always an add.
    fn from(track: MediaTrack) -> Self {
        track.track()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn identity_ignores_operation() {
        let track = MediaTrack::new("Product", 7, "PictureId", 5, "catalog");
        let add = track.clone().track();
        let remove = track.clone().untrack();
        assert_ne!(add, remove);
        assert_eq!(add.track, remove.track);

        let set: HashSet<MediaTrack> = [add.track, remove.track].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn old_and_new_values_are_distinct_tracks() {
        let old = MediaTrack::new("Product", 7, "PictureId", 5, "catalog");
        let new = MediaTrack::new("Product", 7, "PictureId", 9, "catalog");
        assert_ne!(old, new);
    }

    #[test]
    fn unresolved_album_is_empty() {
        let track = MediaTrack::new("Product", 7, "PictureId", 5, "");
        assert!(!track.has_album());
        assert!(track.with_album("catalog").has_album());
    }
}
