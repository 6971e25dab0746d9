//! Declarations of entity properties that hold media file ids, and the
//! process-wide registry aggregating them per entity type.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use crate::album::AlbumLookup;
use crate::entity::TrackableEntity;
use crate::error::TrackingError;
use crate::types::{positive_id, DbId};

type Accessor = Arc<dyn Fn(&dyn Any) -> Option<Option<DbId>> + Send + Sync>;

/// One media foreign key: `entity_type.property` points into `album`.
#[derive(Clone)]
pub struct TrackedMediaProperty {
    entity_type: TypeId,
    entity_type_name: &'static str,
    album: String,
    property: &'static str,
    accessor: Accessor,
}

impl TrackedMediaProperty {
    /// Declare that `T::property` (read by `accessor`) references files of
    /// `album`.
    pub fn new<T, F>(album: impl Into<String>, property: &'static str, accessor: F) -> Self
    where
        T: TrackableEntity,
        F: Fn(&T) -> Option<DbId> + Send + Sync + 'static,
    {
        Self {
            entity_type: TypeId::of::<T>(),
            entity_type_name: std::any::type_name::<T>(),
            album: album.into(),
            property,
            accessor: Arc::new(move |any: &dyn Any| any.downcast_ref::<T>().map(&accessor)),
        }
    }

    pub fn entity_type(&self) -> TypeId {
        self.entity_type
    }

    pub fn album(&self) -> &str {
        &self.album
    }

    pub fn property(&self) -> &'static str {
        self.property
    }

    /// Read the referenced file id. `Ok(None)` means "no reference" (unset
    /// or not positive); an entity the accessor cannot read is a
    /// configuration error.
    pub fn value_of(&self, entity: &dyn TrackableEntity) -> Result<Option<DbId>, TrackingError> {
        match (self.accessor)(entity.unproxied()) {
            Some(value) => Ok(positive_id(value)),
            None => Err(TrackingError::Configuration(format!(
                "tracked property {}.{} cannot be read from entity '{}'",
                self.entity_type_name,
                self.property,
                entity.entity_name()
            ))),
        }
    }
}

impl fmt::Debug for TrackedMediaProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackedMediaProperty")
            .field("entity_type", &self.entity_type_name)
            .field("album", &self.album)
            .field("property", &self.property)
            .finish()
    }
}

/// Registration table handed to album descriptors at startup.
#[derive(Debug, Default, Clone)]
pub struct TrackedPropertyTable {
    properties: Vec<TrackedMediaProperty>,
}

impl TrackedPropertyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `T::property` as a foreign key into `album`. Duplicate
    /// registrations are kept; they only cost a repeated lookup.
    pub fn register<T, F>(&mut self, album: &str, property: &'static str, accessor: F) -> &mut Self
    where
        T: TrackableEntity,
        F: Fn(&T) -> Option<DbId> + Send + Sync + 'static,
    {
        self.properties
            .push(TrackedMediaProperty::new::<T, F>(album, property, accessor));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrackedMediaProperty> {
        self.properties.iter()
    }
}

type PropertyMap = HashMap<TypeId, Arc<[TrackedMediaProperty]>>;

/// Lazily built `entity type -> tracked properties` map over every album.
///
/// Built on first lookup and kept until [`reset`](Self::reset).
pub struct TrackedPropertyRegistry {
    albums: Arc<dyn AlbumLookup>,
    cache: RwLock<Option<Arc<PropertyMap>>>,
}

impl TrackedPropertyRegistry {
    pub fn new(albums: Arc<dyn AlbumLookup>) -> Self {
        Self {
            albums,
            cache: RwLock::new(None),
        }
    }

    /// Properties declared for the entity's declared type, or `None` when the
    /// type has nothing to track.
    pub fn properties_for(
        &self,
        entity: &dyn TrackableEntity,
    ) -> Option<Arc<[TrackedMediaProperty]>> {
        self.properties_for_type(entity.declared_type())
    }

    pub fn properties_for_type(&self, entity_type: TypeId) -> Option<Arc<[TrackedMediaProperty]>> {
        self.map().get(&entity_type).cloned()
    }

    /// Drop the cached map; the next lookup rebuilds it.
    pub fn reset(&self) {
        *self.cache.write().unwrap_or_else(|e| e.into_inner()) = None;
    }

    fn map(&self) -> Arc<PropertyMap> {
        if let Some(map) = self
            .cache
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
        {
            return Arc::clone(map);
        }

        let mut cache = self.cache.write().unwrap_or_else(|e| e.into_inner());
        if let Some(map) = cache.as_ref() {
            return Arc::clone(map);
        }

        let map = Arc::new(self.build());
        tracing::debug!(entity_types = map.len(), "Built tracked media property map");
        *cache = Some(Arc::clone(&map));
        map
    }

    fn build(&self) -> PropertyMap {
        let mut grouped: HashMap<TypeId, Vec<TrackedMediaProperty>> = HashMap::new();
        for album in self.albums.all_albums() {
            for property in album.tracked_properties().iter() {
                grouped
                    .entry(property.entity_type())
                    .or_default()
                    .push(property.clone());
            }
        }
        grouped
            .into_iter()
            .map(|(ty, props)| (ty, Arc::from(props)))
            .collect()
    }
}

impl fmt::Debug for TrackedPropertyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackedPropertyRegistry").finish_non_exhaustive()
    }
}
