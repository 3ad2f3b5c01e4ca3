use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::storage_types::DriverKind;

/// Descriptor for one persisted object (a main file or a thumbnail).
///
/// Returned to the caller, who owns the object's lifecycle from then on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredObject {
    pub path: String,
    pub url: String,
    pub size: u64,
    pub mime_type: String,
    pub driver: DriverKind,
}

/// Metadata of an object as reported by a storage backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectMetadata {
    pub path: String,
    pub size: u64,
    pub mime_type: String,
    pub last_modified: Option<DateTime<Utc>>,
    pub url: String,
}
