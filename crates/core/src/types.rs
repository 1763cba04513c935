/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Opaque per-session freshness token embedded in the channel address.
pub type SessionId = String;
