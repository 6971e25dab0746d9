/// All database primary keys are PostgreSQL BIGSERIAL. Values below `1`
/// mean "not assigned" (unsaved entity, empty foreign key).
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Returns the id when it references a persisted row.
pub fn positive_id(value: Option<DbId>) -> Option<DbId> {
    value.filter(|id| *id > 0)
}
