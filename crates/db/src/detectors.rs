//! Track detection by scanning media foreign-key columns of entity tables.

use std::collections::HashMap;

use futures::{StreamExt, TryStreamExt};
use shopmedia_core::types::DbId;
use shopmedia_core::{MediaTrack, TrackDetector, TrackStream, TrackingError};
use sqlx::PgPool;

/// One integer column holding media file ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSource {
    pub entity_name: String,
    pub table: String,
    pub id_column: String,
    pub column: String,
    /// Property name recorded on the produced tracks.
    pub property: String,
}

impl ColumnSource {
    /// A source keyed by the table's `id` column.
    pub fn new(
        entity_name: impl Into<String>,
        table: impl Into<String>,
        column: impl Into<String>,
        property: impl Into<String>,
    ) -> Self {
        Self {
            entity_name: entity_name.into(),
            table: table.into(),
            id_column: "id".to_string(),
            column: column.into(),
            property: property.into(),
        }
    }

    pub fn with_id_column(mut self, id_column: impl Into<String>) -> Self {
        self.id_column = id_column.into();
        self
    }

    fn select_sql(&self) -> Result<String, TrackingError> {
        for ident in [&self.table, &self.id_column, &self.column] {
            if !is_identifier(ident) {
                return Err(TrackingError::Configuration(format!(
                    "'{ident}' is not a valid SQL identifier for entity '{}'",
                    self.entity_name
                )));
            }
        }
        Ok(format!(
            "SELECT \"{id}\"::bigint, \"{col}\"::bigint FROM \"{table}\" \
             WHERE \"{col}\" > 0 AND \"{id}\" > 0",
            id = self.id_column,
            col = self.column,
            table = self.table,
        ))
    }
}

fn is_identifier(ident: &str) -> bool {
    let mut chars = ident.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[derive(Debug, Clone)]
struct PreparedSource {
    source: ColumnSource,
    sql: String,
}

/// Detector emitting one track per positive value in the configured columns.
///
/// Rows are streamed straight from the database; nothing is buffered beyond
/// what the consumer pulls.
#[derive(Debug, Clone)]
pub struct ColumnScanDetector {
    pool: PgPool,
    sources: HashMap<String, Vec<PreparedSource>>,
}

impl ColumnScanDetector {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            sources: HashMap::new(),
        }
    }

    /// Scan `source` when detecting tracks of `album`.
    pub fn with_source(
        mut self,
        album: impl Into<String>,
        source: ColumnSource,
    ) -> Result<Self, TrackingError> {
        let sql = source.select_sql()?;
        self.sources
            .entry(album.into())
            .or_default()
            .push(PreparedSource { source, sql });
        Ok(self)
    }

    pub fn sources_for(&self, album: &str) -> impl Iterator<Item = &ColumnSource> {
        self.sources
            .get(album)
            .into_iter()
            .flatten()
            .map(|prepared| &prepared.source)
    }
}

impl TrackDetector for ColumnScanDetector {
    fn detect_all_tracks<'a>(&'a self, album_name: &'a str) -> TrackStream<'a> {
        let sources = self
            .sources
            .get(album_name)
            .map(Vec::as_slice)
            .unwrap_or_default();
        let pool = &self.pool;

        Box::pin(
            futures::stream::iter(sources)
                .map(move |prepared| {
                    let source = &prepared.source;
                    sqlx::query_as::<_, (DbId, DbId)>(&prepared.sql)
                        .fetch(pool)
                        .map_ok(move |(entity_id, media_file_id)| {
                            MediaTrack::new(
                                source.entity_name.as_str(),
                                entity_id,
                                source.property.as_str(),
                                media_file_id,
                                album_name,
                            )
                        })
                        .map_err(TrackingError::store)
                })
                .flatten(),
        )
    }
}
