//! Save-pipeline interceptor deriving track deltas from entity saves.
//!
//! A persistence adapter drives one interceptor per logical request through
//! the [`SaveInterceptor`] callbacks:
//!
//! 1. `on_before_update` for every entity about to be updated,
//! 2. `on_after_persist` once an insert, update or delete succeeded,
//! 3. `on_unit_of_work_committed` after all saves of the cycle committed.
//!
//! Update deltas are computed before the save (the original values are
//! still known) but only promoted once the update is confirmed, so a failed
//! save never reaches the tracker.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;

use crate::entity::{EntityKey, TrackableEntity};
use crate::error::TrackingError;
use crate::track::{MediaTrack, TrackAction, TrackOperation};
use crate::tracked_properties::TrackedMediaProperty;
use crate::tracker::MediaTracker;
use crate::types::DbId;

/// Lifecycle state of a saved entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityState {
    Added,
    Modified,
    Deleted,
}

/// One entity passing through the save pipeline.
#[derive(Clone, Copy)]
pub struct SaveEntry<'a> {
    pub entity: &'a dyn TrackableEntity,
    /// Snapshot of the entity as loaded, for updates.
    pub original: Option<&'a dyn TrackableEntity>,
    pub state: EntityState,
}

impl<'a> SaveEntry<'a> {
    pub fn added(entity: &'a dyn TrackableEntity) -> Self {
        Self {
            entity,
            original: None,
            state: EntityState::Added,
        }
    }

    pub fn modified(entity: &'a dyn TrackableEntity, original: &'a dyn TrackableEntity) -> Self {
        Self {
            entity,
            original: Some(original),
            state: EntityState::Modified,
        }
    }

    pub fn deleted(entity: &'a dyn TrackableEntity) -> Self {
        Self {
            entity,
            original: None,
            state: EntityState::Deleted,
        }
    }
}

/// Callbacks a persistence adapter invokes around entity saves.
#[async_trait]
pub trait SaveInterceptor: Send {
    fn on_before_update(&mut self, entry: SaveEntry<'_>) -> Result<(), TrackingError>;

    fn on_after_persist(&mut self, entry: SaveEntry<'_>) -> Result<(), TrackingError>;

    async fn on_unit_of_work_committed(&mut self) -> Result<(), TrackingError>;
}

/// Request-scoped interceptor feeding the [`MediaTracker`].
pub struct MediaTrackInterceptor {
    tracker: Arc<MediaTracker>,
    /// Update deltas waiting for their save to succeed.
    pending: HashMap<EntityKey, Vec<TrackAction>>,
    /// Confirmed actions of the current unit of work, last one per track.
    unit: IndexMap<MediaTrack, TrackOperation>,
    /// Actions already handed to the tracker earlier in this request.
    applied: HashMap<MediaTrack, TrackOperation>,
}

impl MediaTrackInterceptor {
    pub fn new(tracker: Arc<MediaTracker>) -> Self {
        Self {
            tracker,
            pending: HashMap::new(),
            unit: IndexMap::new(),
            applied: HashMap::new(),
        }
    }

    /// Confirmed actions waiting for the commit callback.
    pub fn queued(&self) -> Vec<TrackAction> {
        self.unit
            .iter()
            .map(|(track, op)| TrackAction::new(track.clone(), *op))
            .collect()
    }

    pub fn pending_entities(&self) -> usize {
        self.pending.len()
    }

    fn tracked_properties(
        &self,
        entity: &dyn TrackableEntity,
    ) -> Option<Arc<[TrackedMediaProperty]>> {
        self.tracker.try_get_tracked_properties_for(entity)
    }

    fn enqueue(&mut self, action: TrackAction) {
        self.unit.insert(action.track, action.operation);
    }

    /// One action per positive tracked property value.
    fn current_value_actions(
        &self,
        entity: &dyn TrackableEntity,
        operation: TrackOperation,
    ) -> Result<Vec<TrackAction>, TrackingError> {
        let Some(properties) = self.tracked_properties(entity) else {
            return Ok(Vec::new());
        };
        let mut actions = Vec::new();
        for property in properties.iter() {
            if let Some(file_id) = property.value_of(entity)? {
                actions.push(TrackAction::new(track_for(entity, property, file_id), operation));
            }
        }
        Ok(actions)
    }
}

fn track_for(
    entity: &dyn TrackableEntity,
    property: &TrackedMediaProperty,
    file_id: DbId,
) -> MediaTrack {
    MediaTrack::for_entity(entity, property.property(), file_id).with_album(property.album())
}

#[async_trait]
impl SaveInterceptor for MediaTrackInterceptor {
    fn on_before_update(&mut self, entry: SaveEntry<'_>) -> Result<(), TrackingError> {
        if entry.state != EntityState::Modified {
            return Ok(());
        }
        let Some(properties) = self.tracked_properties(entry.entity) else {
            return Ok(());
        };
        let Some(original) = entry.original else {
            return Err(TrackingError::Configuration(format!(
                "update of {} #{} has tracked media properties but no original snapshot",
                entry.entity.entity_name(),
                entry.entity.entity_id()
            )));
        };

        let mut actions = Vec::new();
        for property in properties.iter() {
            let previous = property.value_of(original)?;
            let current = property.value_of(entry.entity)?;
            if previous == current {
                continue;
            }
            if let Some(file_id) = previous {
                actions.push(track_for(entry.entity, property, file_id).untrack());
            }
            if let Some(file_id) = current {
                actions.push(track_for(entry.entity, property, file_id).track());
            }
        }

        if actions.is_empty() {
            self.pending.remove(&entry.entity.key());
        } else {
            self.pending.insert(entry.entity.key(), actions);
        }
        Ok(())
    }

    fn on_after_persist(&mut self, entry: SaveEntry<'_>) -> Result<(), TrackingError> {
        let actions = match entry.state {
            EntityState::Added => self.current_value_actions(entry.entity, TrackOperation::Track)?,
            EntityState::Deleted => {
                self.current_value_actions(entry.entity, TrackOperation::Untrack)?
            }
            EntityState::Modified => self
                .pending
                .remove(&entry.entity.key())
                .unwrap_or_default(),
        };
        for action in actions {
            self.enqueue(action);
        }
        Ok(())
    }

    async fn on_unit_of_work_committed(&mut self) -> Result<(), TrackingError> {
        let unit = std::mem::take(&mut self.unit);
        self.pending.clear();

        let actions: Vec<TrackAction> = unit
            .into_iter()
            .filter(|(track, op)| self.applied.get(track) != Some(op))
            .map(|(track, op)| TrackAction::new(track, op))
            .collect();
        if actions.is_empty() {
            return Ok(());
        }

        tracing::debug!(actions = actions.len(), "Applying media track changes of unit of work");
        self.tracker
            .begin_scope(false)
            .track_many(actions.iter().cloned())
            .await?;

        for action in actions {
            self.applied.insert(action.track, action.operation);
        }
        Ok(())
    }
}

impl std::fmt::Debug for MediaTrackInterceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaTrackInterceptor")
            .field("pending", &self.pending.len())
            .field("unit", &self.unit.len())
            .field("applied", &self.applied.len())
            .finish()
    }
}
