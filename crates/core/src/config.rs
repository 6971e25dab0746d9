use crate::error::TrackingError;
use crate::media_file::OrphanPolicy;

/// Default number of detected tracks committed per chunk.
pub const DEFAULT_DETECT_CHUNK_SIZE: usize = 500;

/// Media tracking configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingConfig {
    /// Whether files losing their last track become transient outside an
    /// explicit scope (default: `false`).
    pub make_files_transient_when_orphaned: bool,
    /// Tracks per committed chunk during full re-detection (default: `500`).
    pub detect_chunk_size: usize,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            make_files_transient_when_orphaned: false,
            detect_chunk_size: DEFAULT_DETECT_CHUNK_SIZE,
        }
    }
}

impl TrackingConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                      | Default |
    /// |------------------------------|---------|
    /// | `MEDIA_MAKE_FILES_TRANSIENT` | `false` |
    /// | `MEDIA_DETECT_CHUNK_SIZE`    | `500`   |
    pub fn from_env() -> Result<Self, TrackingError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) over an arbitrary key source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, TrackingError> {
        let defaults = Self::default();

        let make_files_transient_when_orphaned = match lookup("MEDIA_MAKE_FILES_TRANSIENT") {
            Some(raw) => parse_bool(&raw).ok_or_else(|| {
                TrackingError::Configuration(format!(
                    "MEDIA_MAKE_FILES_TRANSIENT must be true or false, got '{raw}'"
                ))
            })?,
            None => defaults.make_files_transient_when_orphaned,
        };

        let detect_chunk_size = match lookup("MEDIA_DETECT_CHUNK_SIZE") {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| {
                    TrackingError::Configuration(format!(
                        "MEDIA_DETECT_CHUNK_SIZE must be a positive integer, got '{raw}'"
                    ))
                })?,
            None => defaults.detect_chunk_size,
        };

        Ok(Self {
            make_files_transient_when_orphaned,
            detect_chunk_size,
        })
    }

    pub fn orphan_policy(&self) -> OrphanPolicy {
        OrphanPolicy::from_flag(self.make_files_transient_when_orphaned)
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use assert_matches::assert_matches;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<TrackingConfig, TrackingError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        TrackingConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let config = load(&[]).unwrap();
        assert_eq!(config, TrackingConfig::default());
        assert_eq!(config.orphan_policy(), OrphanPolicy::KeepPersistent);
    }

    #[test]
    fn reads_overrides() {
        let config = load(&[
            ("MEDIA_MAKE_FILES_TRANSIENT", "TRUE"),
            ("MEDIA_DETECT_CHUNK_SIZE", "100"),
        ])
        .unwrap();
        assert!(config.make_files_transient_when_orphaned);
        assert_eq!(config.detect_chunk_size, 100);
        assert_eq!(config.orphan_policy(), OrphanPolicy::MakeTransient);
    }

    #[test]
    fn rejects_invalid_values() {
        assert_matches!(
            load(&[("MEDIA_DETECT_CHUNK_SIZE", "0")]),
            Err(TrackingError::Configuration(_))
        );
        assert_matches!(
            load(&[("MEDIA_MAKE_FILES_TRANSIENT", "maybe")]),
            Err(TrackingError::Configuration(_))
        );
    }
}
