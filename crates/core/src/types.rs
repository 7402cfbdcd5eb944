/// Backend-assigned identifiers (runs, datasets, algorithms, presets) are
/// opaque strings.
pub type EntityId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// The backend reports creation times as fractional unix seconds.
pub type UnixSeconds = f64;
