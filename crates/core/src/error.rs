use crate::messages::{self, Localizer};
use crate::types::DbId;

/// Boxed error produced by a persistence adapter.
pub type StoreError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum TrackingError {
    /// A media file that is being tracked is not located in any album.
    #[error("Media file #{file_id} is not assigned to an album and cannot be tracked")]
    UnassignedFile { file_id: DbId },

    #[error("Album '{album}' does not exist")]
    UnknownAlbum { album: String },

    #[error("Album '{album}' has no track detector")]
    AlbumWithoutDetector { album: String },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Store error: {0}")]
    Store(#[source] StoreError),
}

impl TrackingError {
    /// Wrap any persistence error.
    pub fn store(err: impl Into<StoreError>) -> Self {
        Self::Store(err.into())
    }

    /// Resource key of the user-facing message, if this error has one.
    pub fn resource_key(&self) -> Option<&'static str> {
        match self {
            Self::UnassignedFile { .. } => Some(messages::TRACK_UNASSIGNED_FILE),
            Self::UnknownAlbum { .. } => Some(messages::ALBUM_NONEXISTENT),
            Self::AlbumWithoutDetector { .. } => Some(messages::ALBUM_NO_TRACK_DETECTOR),
            Self::Configuration(_) | Self::Store(_) => None,
        }
    }

    /// Render the error for an operator. Errors without a resource key fall
    /// back to their `Display` text.
    pub fn localized(&self, localizer: &dyn Localizer) -> String {
        let Some(key) = self.resource_key() else {
            return self.to_string();
        };
        match self {
            Self::UnassignedFile { file_id } => localizer.get(key, &[file_id.to_string().as_str()]),
            Self::UnknownAlbum { album } | Self::AlbumWithoutDetector { album } => {
                localizer.get(key, &[album.as_str()])
            }
            _ => self.to_string(),
        }
    }
}
