//! Document store client speaking the platform's REST database API.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use metrics::{counter, histogram};
use reqwest::Method;
use serde_json::{Value, json};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::application::collaborators::{
    DocumentQuery, DocumentStore, SortDirection, StoreError, StoredDocument,
};
use crate::domain::types::Collection;

use super::client::{PlatformClient, read_failure};

const METRIC_STORE_REQUESTS: &str = "pedium_store_requests_total";
const METRIC_STORE_REQUEST_MS: &str = "pedium_store_request_ms";

pub struct HttpDocumentStore {
    platform: Arc<PlatformClient>,
    database: String,
}

impl HttpDocumentStore {
    pub fn new(platform: Arc<PlatformClient>, database: impl Into<String>) -> Self {
        Self {
            platform,
            database: database.into(),
        }
    }

    fn documents_path(&self, collection: Collection) -> String {
        format!(
            "databases/{}/collections/{}/documents",
            self.database,
            collection.as_str()
        )
    }

    fn document_path(&self, collection: Collection, id: &str) -> String {
        format!("{}/{id}", self.documents_path(collection))
    }

    async fn send(
        &self,
        operation: &'static str,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, StoreError> {
        let started = Instant::now();
        let response = request.send().await.map_err(StoreError::transport)?;
        histogram!(METRIC_STORE_REQUEST_MS, "operation" => operation)
            .record(started.elapsed().as_secs_f64() * 1000.0);
        counter!(METRIC_STORE_REQUESTS, "operation" => operation).increment(1);
        Ok(response)
    }
}

#[async_trait]
impl DocumentStore for HttpDocumentStore {
    async fn create(
        &self,
        collection: Collection,
        id: &str,
        fields: Value,
    ) -> Result<StoredDocument, StoreError> {
        let request = self
            .platform
            .request(Method::POST, &self.documents_path(collection))
            .json(&json!({ "documentId": id, "data": fields }));

        let response = self.send("create", request).await?;
        if !response.status().is_success() {
            return Err(rejection(response).await);
        }
        parse_document(response.json().await.map_err(StoreError::decode)?)
    }

    async fn get(&self, collection: Collection, id: &str) -> Result<StoredDocument, StoreError> {
        let request = self
            .platform
            .request(Method::GET, &self.document_path(collection, id));

        let response = self.send("get", request).await?;
        if !response.status().is_success() {
            return Err(rejection(response).await);
        }
        parse_document(response.json().await.map_err(StoreError::decode)?)
    }

    async fn update(
        &self,
        collection: Collection,
        id: &str,
        fields: Value,
    ) -> Result<StoredDocument, StoreError> {
        let request = self
            .platform
            .request(Method::PATCH, &self.document_path(collection, id))
            .json(&json!({ "data": fields }));

        let response = self.send("update", request).await?;
        if !response.status().is_success() {
            return Err(rejection(response).await);
        }
        parse_document(response.json().await.map_err(StoreError::decode)?)
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<(), StoreError> {
        let request = self
            .platform
            .request(Method::DELETE, &self.document_path(collection, id));

        let response = self.send("delete", request).await?;
        if !response.status().is_success() {
            return Err(rejection(response).await);
        }
        Ok(())
    }

    async fn list(
        &self,
        collection: Collection,
        query: &DocumentQuery,
    ) -> Result<Vec<StoredDocument>, StoreError> {
        let request = self
            .platform
            .request(Method::GET, &self.documents_path(collection))
            .query(&encode_query(query));

        let response = self.send("list", request).await?;
        if !response.status().is_success() {
            return Err(rejection(response).await);
        }

        let body: Value = response.json().await.map_err(StoreError::decode)?;
        let documents = body
            .get("documents")
            .and_then(Value::as_array)
            .ok_or_else(|| StoreError::decode("list response has no `documents` array"))?;

        documents.iter().cloned().map(parse_document).collect()
    }
}

async fn rejection(response: reqwest::Response) -> StoreError {
    if response.status().as_u16() == 404 {
        return StoreError::NotFound;
    }
    let failure = read_failure(response).await;
    StoreError::Rejected {
        status: failure.status,
        message: failure.message,
    }
}

/// Encode a query as the platform's `queries[]` JSON strings.
fn encode_query(query: &DocumentQuery) -> Vec<(&'static str, String)> {
    let mut params = Vec::new();
    for filter in &query.filters {
        params.push((
            "queries[]",
            json!({
                "method": "equal",
                "attribute": filter.field,
                "values": [filter.equals],
            })
            .to_string(),
        ));
    }
    if let Some(order) = query.order.as_ref() {
        let method = match order.direction {
            SortDirection::Ascending => "orderAsc",
            SortDirection::Descending => "orderDesc",
        };
        params.push((
            "queries[]",
            json!({ "method": method, "attribute": order.field }).to_string(),
        ));
    }
    if let Some(limit) = query.limit {
        params.push((
            "queries[]",
            json!({ "method": "limit", "values": [limit] }).to_string(),
        ));
    }
    params
}

/// Split a platform document into id, creation time, and user fields.
/// System attributes (`$`-prefixed) are stripped from the field object.
fn parse_document(mut value: Value) -> Result<StoredDocument, StoreError> {
    let object = value
        .as_object_mut()
        .ok_or_else(|| StoreError::decode("document is not an object"))?;

    let id = object
        .get("$id")
        .and_then(Value::as_str)
        .ok_or_else(|| StoreError::decode("document has no `$id`"))?
        .to_string();

    let created_at = object
        .get("$createdAt")
        .and_then(Value::as_str)
        .ok_or_else(|| StoreError::decode("document has no `$createdAt`"))
        .and_then(|raw| OffsetDateTime::parse(raw, &Rfc3339).map_err(StoreError::decode))?;

    object.retain(|key, _| !key.starts_with('$'));

    Ok(StoredDocument {
        id,
        created_at,
        fields: value,
    })
}
