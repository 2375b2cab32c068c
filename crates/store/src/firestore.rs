//! Firestore REST backend.
//!
//! Reads go through three endpoints of the v1 API:
//! - `POST {documents}:runQuery` for "most recent first" queries
//! - `GET {documents}/{collection}/{id}` for single documents
//! - `GET {documents}/{collection}` (paged) for full collection scans
//!
//! Firestore wraps every field in a typed value (`{"stringValue": "..."}`);
//! [`decode_value`] unwraps them into plain JSON so records decode the same
//! way they do from the in-memory store.

use async_trait::async_trait;
use myplant_core::error::StoreError;
use myplant_core::record::{DeviceRecord, EventRecord, Reading, UserProfile};
use myplant_core::store::{Devices, Events, Readings, RecentQuery, UserProfiles};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::collections;
use crate::document::Document;

const PAGE_SIZE: usize = 300;

/// A Firestore database reached over REST.
pub struct FirestoreStore {
    base_url: String,
    project_id: String,
    database: String,
    access_token: Option<String>,
    client: reqwest::Client,
}

impl FirestoreStore {
    pub fn new(project_id: impl Into<String>, access_token: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        Self {
            base_url: "https://firestore.googleapis.com/v1".into(),
            project_id: project_id.into(),
            database: "(default)".into(),
            access_token,
            client,
        }
    }

    /// Point at a different endpoint (emulator, proxy).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    fn documents_url(&self) -> String {
        format!(
            "{}/projects/{}/databases/{}/documents",
            self.base_url, self.project_id, self.database
        )
    }

    /// `{documents}/{collection}/{id}` with both parts percent-encoded as
    /// single path segments.
    fn document_url(&self, collection: &str, id: &str) -> Result<reqwest::Url, StoreError> {
        let invalid = |reason: String| StoreError::NotConfigured(format!("Invalid Firestore URL: {reason}"));
        let mut url = reqwest::Url::parse(&self.documents_url()).map_err(|e| invalid(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| invalid(self.base_url.clone()))?
            .push(collection)
            .push(id);
        Ok(url)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(
        &self,
        collection: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, StoreError> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND || status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(StoreError::QueryFailed {
            collection: collection.to_string(),
            reason: format!("HTTP {}: {body}", status.as_u16()),
        })
    }

    async fn parse<T: serde::de::DeserializeOwned>(
        collection: &str,
        response: reqwest::Response,
    ) -> Result<T, StoreError> {
        response.json().await.map_err(|e| StoreError::QueryFailed {
            collection: collection.to_string(),
            reason: format!("Failed to parse response: {e}"),
        })
    }

    async fn run_query(&self, collection: &str, query: &RecentQuery) -> Result<Vec<Document>, StoreError> {
        let url = format!("{}:runQuery", self.documents_url());
        debug!(collection, limit = query.limit, device = ?query.device_id, "Running Firestore query");

        let response = self
            .send(collection, self.client.post(&url).json(&structured_query(collection, query)))
            .await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(StoreError::QueryFailed {
                collection: collection.to_string(),
                reason: "HTTP 404: database not found".into(),
            });
        }

        let rows: Vec<QueryRow> = Self::parse(collection, response).await?;
        Ok(rows
            .into_iter()
            .filter_map(|row| row.document)
            .map(|doc| decode_document(&doc))
            .collect())
    }

    async fn get_document(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let url = self.document_url(collection, id)?;
        let response = self.send(collection, self.client.get(url)).await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let doc: Value = Self::parse(collection, response).await?;
        Ok(Some(decode_document(&doc)))
    }

    async fn list_documents(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        let url = format!("{}/{collection}", self.documents_url());
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self.client.get(&url).query(&[("pageSize", PAGE_SIZE.to_string())]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token)]);
            }

            let response = self.send(collection, request).await?;
            if response.status() == reqwest::StatusCode::NOT_FOUND {
                break;
            }
            let page: ListPage = Self::parse(collection, response).await?;
            documents.extend(page.documents.iter().map(decode_document));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(documents)
    }
}

/// Build the `runQuery` body for a "most recent first" query.
pub fn structured_query(collection: &str, query: &RecentQuery) -> Value {
    let mut structured = json!({
        "from": [{ "collectionId": collection }],
        "orderBy": [{
            "field": { "fieldPath": "timestamp" },
            "direction": "DESCENDING"
        }],
        "limit": query.limit,
    });

    if let Some(device) = &query.device_id {
        structured["where"] = json!({
            "fieldFilter": {
                "field": { "fieldPath": "deviceId" },
                "op": "EQUAL",
                "value": { "stringValue": device }
            }
        });
    }

    json!({ "structuredQuery": structured })
}

/// Unwrap a Firestore typed value into plain JSON.
///
/// Integers arrive as decimal strings; timestamps stay RFC 3339 text.
pub fn decode_value(value: &Value) -> Value {
    let Some(obj) = value.as_object() else {
        return Value::Null;
    };
    let Some((kind, inner)) = obj.iter().next() else {
        return Value::Null;
    };

    match kind.as_str() {
        "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" | "booleanValue"
        | "geoPointValue" => inner.clone(),
        "integerValue" => match inner {
            Value::String(s) => s.parse::<i64>().map(Value::from).unwrap_or(Value::Null),
            other => other.clone(),
        },
        "doubleValue" => match inner {
            Value::Number(_) => inner.clone(),
            Value::String(s) => s
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map_or(Value::Null, Value::Number),
            _ => Value::Null,
        },
        "mapValue" => decode_fields(inner.get("fields")),
        "arrayValue" => Value::Array(
            inner
                .get("values")
                .and_then(Value::as_array)
                .map(|values| values.iter().map(decode_value).collect())
                .unwrap_or_default(),
        ),
        _ => Value::Null,
    }
}

fn decode_fields(fields: Option<&Value>) -> Value {
    let decoded: Map<String, Value> = fields
        .and_then(Value::as_object)
        .map(|fields| {
            fields
                .iter()
                .map(|(name, value)| (name.clone(), decode_value(value)))
                .collect()
        })
        .unwrap_or_default();
    Value::Object(decoded)
}

/// Decode a REST document: the id is the last segment of `name`.
pub fn decode_document(doc: &Value) -> Document {
    let id = doc
        .get("name")
        .and_then(Value::as_str)
        .and_then(|name| name.rsplit('/').next())
        .unwrap_or_default();
    Document::new(id, decode_fields(doc.get("fields")))
}

#[derive(Debug, Deserialize)]
struct QueryRow {
    #[serde(default)]
    document: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListPage {
    #[serde(default)]
    documents: Vec<Value>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[async_trait]
impl UserProfiles for FirestoreStore {
    async fn get_by_id(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError> {
        self.get_document(collections::USER_PROFILES, user_id)
            .await?
            .map(Document::into_profile)
            .transpose()
    }
}

#[async_trait]
impl Devices for FirestoreStore {
    async fn list(&self) -> Result<Vec<DeviceRecord>, StoreError> {
        self.list_documents(collections::DEVICES)
            .await?
            .into_iter()
            .map(Document::into_device)
            .collect()
    }
}

#[async_trait]
impl Readings for FirestoreStore {
    async fn query_recent(&self, query: &RecentQuery) -> Result<Vec<Reading>, StoreError> {
        self.run_query(collections::READINGS, query)
            .await?
            .into_iter()
            .map(Document::into_reading)
            .collect()
    }
}

#[async_trait]
impl Events for FirestoreStore {
    async fn query_recent(&self, query: &RecentQuery) -> Result<Vec<EventRecord>, StoreError> {
        self.run_query(collections::EVENTS, query)
            .await?
            .into_iter()
            .map(Document::into_event)
            .collect()
    }
}
