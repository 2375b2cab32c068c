//! In-memory store, useful for testing and local runs without Firestore.

use async_trait::async_trait;
use myplant_core::error::StoreError;
use myplant_core::record::{DeviceRecord, EventRecord, Reading, UserProfile};
use myplant_core::store::{Devices, Events, Readings, RecentQuery, UserProfiles};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::collections;
use crate::document::{Document, compare_values};

const ORDER_FIELD: &str = "timestamp";
const FILTER_FIELD: &str = "deviceId";

/// Documents grouped by collection, in insertion order.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    collections: Arc<RwLock<HashMap<String, Vec<Document>>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a document. An empty id gets a generated one.
    pub async fn insert(&self, collection: &str, id: impl Into<String>, fields: Value) -> String {
        let mut id = id.into();
        if id.is_empty() {
            id = Uuid::new_v4().to_string();
        }
        let mut all = self.collections.write().await;
        let docs = all.entry(collection.to_string()).or_default();
        docs.retain(|d| d.id != id);
        docs.push(Document::new(id.clone(), fields));
        id
    }

    pub async fn insert_profile(&self, user_id: &str, fields: Value) {
        self.insert(collections::USER_PROFILES, user_id, fields).await;
    }

    pub async fn insert_device(&self, device_id: &str, fields: Value) {
        self.insert(collections::DEVICES, device_id, fields).await;
    }

    pub async fn insert_reading(&self, fields: Value) -> String {
        self.insert(collections::READINGS, "", fields).await
    }

    pub async fn insert_event(&self, fields: Value) -> String {
        self.insert(collections::EVENTS, "", fields).await
    }

    /// Number of documents in a collection.
    pub async fn count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map_or(0, Vec::len)
    }

    async fn get(&self, collection: &str, id: &str) -> Option<Document> {
        self.collections
            .read()
            .await
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| d.id == id).cloned())
    }

    async fn all(&self, collection: &str) -> Vec<Document> {
        self.collections
            .read()
            .await
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    /// Equality filter on `deviceId`, `timestamp` descending, limited.
    ///
    /// Documents without a `timestamp` field are left out, as Firestore
    /// does for an ordered query.
    async fn recent(&self, collection: &str, query: &RecentQuery) -> Vec<Document> {
        let mut docs: Vec<Document> = self
            .all(collection)
            .await
            .into_iter()
            .filter(|d| d.fields.get(ORDER_FIELD).is_some())
            .filter(|d| match &query.device_id {
                Some(device) => d.fields.get(FILTER_FIELD).and_then(Value::as_str) == Some(device),
                None => true,
            })
            .collect();

        docs.sort_by(|a, b| compare_values(&b.fields[ORDER_FIELD], &a.fields[ORDER_FIELD]));
        docs.truncate(query.limit);
        docs
    }
}

#[async_trait]
impl UserProfiles for InMemoryStore {
    async fn get_by_id(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError> {
        self.get(collections::USER_PROFILES, user_id)
            .await
            .map(Document::into_profile)
            .transpose()
    }
}

#[async_trait]
impl Devices for InMemoryStore {
    async fn list(&self) -> Result<Vec<DeviceRecord>, StoreError> {
        self.all(collections::DEVICES)
            .await
            .into_iter()
            .map(Document::into_device)
            .collect()
    }
}

#[async_trait]
impl Readings for InMemoryStore {
    async fn query_recent(&self, query: &RecentQuery) -> Result<Vec<Reading>, StoreError> {
        self.recent(collections::READINGS, query)
            .await
            .into_iter()
            .map(Document::into_reading)
            .collect()
    }
}

#[async_trait]
impl Events for InMemoryStore {
    async fn query_recent(&self, query: &RecentQuery) -> Result<Vec<EventRecord>, StoreError> {
        self.recent(collections::EVENTS, query)
            .await
            .into_iter()
            .map(Document::into_event)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use myplant_core::record::RawTimestamp;
    use serde_json::json;

    #[tokio::test]
    async fn readings_newest_first_with_limit() {
        let store = InMemoryStore::new();
        store.insert_reading(json!({"deviceId": "a", "timestamp": "2024-05-01T08:00:00Z"})).await;
        store.insert_reading(json!({"deviceId": "a", "timestamp": "2024-05-01T10:00:00Z"})).await;
        store.insert_reading(json!({"deviceId": "a", "timestamp": "2024-05-01T09:00:00Z"})).await;

        let readings = Readings::query_recent(&store, &RecentQuery::latest(2)).await.unwrap();
        let stamps: Vec<_> = readings.iter().map(|r| r.timestamp.clone().unwrap()).collect();
        assert_eq!(
            stamps,
            vec![
                RawTimestamp::from("2024-05-01T10:00:00Z"),
                RawTimestamp::from("2024-05-01T09:00:00Z"),
            ]
        );
    }

    #[tokio::test]
    async fn device_filter_is_exact() {
        let store = InMemoryStore::new();
        store.insert_reading(json!({"deviceId": "a", "timestamp": "2024-05-01T08:00:00Z"})).await;
        store.insert_reading(json!({"deviceId": "b", "timestamp": "2024-05-01T09:00:00Z"})).await;

        let readings = Readings::query_recent(&store, &RecentQuery::for_device(Some("a"), 10))
            .await
            .unwrap();
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].device_id.as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn strings_order_after_numbers_descending() {
        let store = InMemoryStore::new();
        store.insert_reading(json!({"timestamp": 51651})).await;
        store.insert_reading(json!({"timestamp": "2024-05-01T08:00:00Z"})).await;
        store.insert_reading(json!({"temperature": 20})).await;

        let readings = Readings::query_recent(&store, &RecentQuery::latest(10)).await.unwrap();
        assert_eq!(readings.len(), 2);
        assert_eq!(readings[0].timestamp, Some(RawTimestamp::from("2024-05-01T08:00:00Z")));
        assert_eq!(readings[1].timestamp, Some(RawTimestamp::Millis(51651.0)));
    }

    #[tokio::test]
    async fn profile_lookup() {
        let store = InMemoryStore::new();
        store.insert_profile("uid-1", json!({"role": "admin"})).await;

        let found = store.get_by_id("uid-1").await.unwrap().unwrap();
        assert!(found.is_admin());
        assert!(store.get_by_id("uid-2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn insert_replaces_same_id() {
        let store = InMemoryStore::new();
        store.insert_device("esp32-a", json!({"status": "offline"})).await;
        store.insert_device("esp32-a", json!({"status": "online"})).await;

        let devices = store.list().await.unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].status.as_deref(), Some("online"));
        assert_eq!(store.count(collections::DEVICES).await, 1);
    }

    #[tokio::test]
    async fn events_query() {
        let store = InMemoryStore::new();
        store
            .insert_event(json!({"type": "alert", "timestamp": "2024-05-01T08:00:00Z"}))
            .await;

        let events = Events::query_recent(&store, &RecentQuery::latest(15)).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind.as_deref(), Some("alert"));
    }
}
