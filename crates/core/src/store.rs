//! Repository traits over the document store.
//!
//! One narrow, read-only trait per collection. Handlers never see the
//! store's own query API, which keeps the context pipeline testable with
//! in-memory fakes.
//!
//! Implementations: Firestore (REST), in-memory (for testing and local runs).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::record::{DeviceRecord, EventRecord, Reading, UserProfile};

/// A "most recent first" query: optional equality filter on `deviceId`,
/// ordered by `timestamp` descending, capped at `limit` documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentQuery {
    /// Only documents whose `deviceId` equals this value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,

    /// Maximum number of documents returned.
    pub limit: usize,
}

impl RecentQuery {
    pub fn latest(limit: usize) -> Self {
        Self { device_id: None, limit }
    }

    pub fn for_device(device_id: Option<&str>, limit: usize) -> Self {
        Self {
            device_id: device_id.map(str::to_string),
            limit,
        }
    }
}

/// Whether a failed fetch aborts the operation that needed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchPolicy {
    /// Failure propagates to the caller.
    Required,
    /// Failure is logged and replaced by an empty result.
    BestEffort,
}

impl FetchPolicy {
    /// Apply the policy to a fetch result.
    ///
    /// `BestEffort` turns an error into `T::default()` after logging it
    /// with the collection name; `Required` passes the error through.
    pub fn apply<T: Default>(
        self,
        collection: &str,
        result: std::result::Result<T, StoreError>,
    ) -> std::result::Result<T, StoreError> {
        match (self, result) {
            (_, Ok(value)) => Ok(value),
            (FetchPolicy::Required, Err(e)) => Err(e),
            (FetchPolicy::BestEffort, Err(e)) => {
                tracing::warn!(collection, error = %e, "Could not fetch, continuing without it");
                Ok(T::default())
            }
        }
    }
}

/// `userProfiles` collection.
#[async_trait]
pub trait UserProfiles: Send + Sync {
    /// Look up a profile by user id.
    async fn get_by_id(&self, user_id: &str) -> std::result::Result<Option<UserProfile>, StoreError>;
}

/// `devices` collection.
#[async_trait]
pub trait Devices: Send + Sync {
    /// Every registered device.
    async fn list(&self) -> std::result::Result<Vec<DeviceRecord>, StoreError>;
}

/// `readings` collection.
#[async_trait]
pub trait Readings: Send + Sync {
    /// Most recent readings first.
    async fn query_recent(&self, query: &RecentQuery) -> std::result::Result<Vec<Reading>, StoreError>;
}

/// `events` collection.
#[async_trait]
pub trait Events: Send + Sync {
    /// Most recent events first.
    async fn query_recent(&self, query: &RecentQuery) -> std::result::Result<Vec<EventRecord>, StoreError>;
}
