//! File storage client for the platform's bucket API.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use metrics::counter;
use reqwest::{
    Method,
    multipart::{Form, Part},
};
use serde_json::Value;
use tracing::debug;

use crate::application::collaborators::{BlobStore, StoredFile, UploadError};

use super::client::{PlatformClient, read_failure};

const METRIC_UPLOAD_BYTES: &str = "pedium_upload_bytes_total";

pub struct HttpBlobStore {
    platform: Arc<PlatformClient>,
    bucket: String,
}

impl HttpBlobStore {
    pub fn new(platform: Arc<PlatformClient>, bucket: impl Into<String>) -> Self {
        Self {
            platform,
            bucket: bucket.into(),
        }
    }

    fn view_url(&self, file_id: &str) -> String {
        self.platform.endpoint_url(&format!(
            "storage/buckets/{}/files/{file_id}/view?project={}",
            self.bucket,
            self.platform.project()
        ))
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    async fn upload(
        &self,
        payload: Bytes,
        filename: &str,
        content_type: &str,
    ) -> Result<StoredFile, UploadError> {
        let size = payload.len();
        debug!(bucket = %self.bucket, filename, size, "uploading file");

        let part = Part::bytes(payload.to_vec())
            .file_name(filename.to_string())
            .mime_str(content_type)
            .map_err(UploadError::transport)?;
        let form = Form::new().text("fileId", "unique()").part("file", part);

        let response = self
            .platform
            .request(Method::POST, &format!("storage/buckets/{}/files", self.bucket))
            .multipart(form)
            .send()
            .await
            .map_err(UploadError::transport)?;

        if !response.status().is_success() {
            let failure = read_failure(response).await;
            return Err(UploadError::Rejected {
                status: failure.status,
                message: failure.message,
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|err| UploadError::Decode(err.to_string()))?;
        let id = body
            .get("$id")
            .and_then(Value::as_str)
            .ok_or_else(|| UploadError::Decode("upload response has no `$id`".to_string()))?
            .to_string();

        counter!(METRIC_UPLOAD_BYTES).increment(size as u64);

        let url = self.view_url(&id);
        Ok(StoredFile { id, url })
    }
}
