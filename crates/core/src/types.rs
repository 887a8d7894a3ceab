/// Catalog provider ids are backend BIGINT keys.
pub type ProviderId = i64;

/// Service request ids are backend BIGINT keys.
pub type ServiceRequestId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
