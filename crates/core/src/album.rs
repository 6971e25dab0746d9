//! Album metadata and the lookup service that maps files to albums.
//!
//! Albums are the root folders of the media tree. Each album carries the
//! tracked-property declarations of the features storing files in it and,
//! optionally, the type of the detector able to re-scan its references.

use std::any::TypeId;
use std::collections::HashMap;

use crate::detector::TrackDetector;
use crate::entity::TrackableEntity;
use crate::media_file::MediaFile;
use crate::tracked_properties::TrackedPropertyTable;
use crate::types::DbId;

/// Type key of a registered [`TrackDetector`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DetectorKey {
    type_id: TypeId,
    type_name: &'static str,
}

impl DetectorKey {
    pub fn of<D: TrackDetector + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<D>(),
            type_name: std::any::type_name::<D>(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

/// Metadata of one album.
#[derive(Debug, Clone)]
pub struct AlbumInfo {
    /// Id of the album's root folder.
    pub id: DbId,
    pub name: String,
    pub is_system_album: bool,
    detector: Option<DetectorKey>,
    tracked_properties: TrackedPropertyTable,
}

impl AlbumInfo {
    pub fn new(id: DbId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            is_system_album: false,
            detector: None,
            tracked_properties: TrackedPropertyTable::new(),
        }
    }

    pub fn system(mut self) -> Self {
        self.is_system_album = true;
        self
    }

    /// Attach the detector type responsible for this album. Albums without
    /// one do not support reference detection.
    pub fn with_detector<D: TrackDetector + 'static>(mut self) -> Self {
        self.detector = Some(DetectorKey::of::<D>());
        self
    }

    /// Declare `T::property` as a media foreign key into this album.
    pub fn track<T, F>(mut self, property: &'static str, accessor: F) -> Self
    where
        T: TrackableEntity,
        F: Fn(&T) -> Option<DbId> + Send + Sync + 'static,
    {
        let album = self.name.clone();
        self.tracked_properties
            .register::<T, F>(&album, property, accessor);
        self
    }

    /// Lets feature modules register into an existing table.
    pub fn configure_tracks(mut self, configure: impl FnOnce(&str, &mut TrackedPropertyTable)) -> Self {
        configure(&self.name, &mut self.tracked_properties);
        self
    }

    pub fn can_detect_tracks(&self) -> bool {
        self.detector.is_some()
    }

    pub fn detector(&self) -> Option<DetectorKey> {
        self.detector
    }

    pub fn tracked_properties(&self) -> &TrackedPropertyTable {
        &self.tracked_properties
    }
}

/// Album/folder service consumed by the tracker.
pub trait AlbumLookup: Send + Sync {
    /// The album containing `file`, or `None` when the file sits outside
    /// every album.
    fn find_album_for_file(&self, file: &MediaFile) -> Option<&AlbumInfo>;

    fn album_by_name(&self, name: &str) -> Option<&AlbumInfo>;

    fn all_albums(&self) -> Vec<&AlbumInfo>;
}

/// In-memory album registry with a folder tree.
///
/// Album ids are root folder ids; any other folder reaches its album by
/// following parent links.
#[derive(Debug, Clone, Default)]
pub struct AlbumRegistry {
    albums: Vec<AlbumInfo>,
    parents: HashMap<DbId, DbId>,
}

impl AlbumRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_album(mut self, album: AlbumInfo) -> Self {
        self.add_album(album);
        self
    }

    pub fn add_album(&mut self, album: AlbumInfo) {
        self.albums.retain(|a| a.name != album.name);
        self.albums.push(album);
    }

    /// Register a sub folder below `parent_id`.
    pub fn with_folder(mut self, folder_id: DbId, parent_id: DbId) -> Self {
        self.parents.insert(folder_id, parent_id);
        self
    }

    fn album_by_id(&self, id: DbId) -> Option<&AlbumInfo> {
        self.albums.iter().find(|a| a.id == id)
    }

    fn root_of(&self, folder_id: DbId) -> DbId {
        let mut current = folder_id;
        // A malformed tree may contain a cycle; never walk more steps than
        // there are links.
        for _ in 0..=self.parents.len() {
            match self.parents.get(&current) {
                Some(parent) => current = *parent,
                None => break,
            }
        }
        current
    }
}

impl AlbumLookup for AlbumRegistry {
    fn find_album_for_file(&self, file: &MediaFile) -> Option<&AlbumInfo> {
        let folder_id = file.folder_id?;
        self.album_by_id(self.root_of(folder_id))
    }

    fn album_by_name(&self, name: &str) -> Option<&AlbumInfo> {
        self.albums.iter().find(|a| a.name == name)
    }

    fn all_albums(&self) -> Vec<&AlbumInfo> {
        self.albums.iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> AlbumRegistry {
        AlbumRegistry::new()
            .with_album(AlbumInfo::new(1, "catalog").system())
            .with_album(AlbumInfo::new(2, "content"))
            .with_folder(10, 1)
            .with_folder(11, 10)
    }

    #[test]
    fn resolves_album_through_folder_chain() {
        let registry = registry();
        let file = MediaFile::new(5, Some(11));
        let album = registry.find_album_for_file(&file).expect("album");
        assert_eq!(album.name, "catalog");
        assert!(album.is_system_album);
    }

    #[test]
    fn file_without_folder_has_no_album() {
        assert!(registry()
            .find_album_for_file(&MediaFile::new(5, None))
            .is_none());
    }

    #[test]
    fn folder_outside_albums_has_no_album() {
        let registry = registry().with_folder(20, 99);
        assert!(registry
            .find_album_for_file(&MediaFile::new(5, Some(20)))
            .is_none());
    }

    #[test]
    fn folder_cycle_terminates() {
        let registry = registry().with_folder(30, 31).with_folder(31, 30);
        assert!(registry
            .find_album_for_file(&MediaFile::new(5, Some(30)))
            .is_none());
    }

    #[test]
    fn album_without_detector_cannot_detect() {
        let registry = registry();
        assert!(!registry.album_by_name("content").unwrap().can_detect_tracks());
        assert!(registry.album_by_name("missing").is_none());
    }
}
