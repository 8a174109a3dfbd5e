/// A row travelling between the service and the row store: a flat mapping
/// from column name to JSON value, possibly carrying named relation
/// sub-objects embedded by the store's join machinery.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Entity row identifiers are opaque strings (the origin store uses UUID
/// text keys).
pub type RowId = String;

/// Archive record identifiers, generated at archive time.
pub type ArchiveId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
