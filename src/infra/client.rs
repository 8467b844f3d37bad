//! Shared HTTP plumbing for the hosted backend platform.
//!
//! The document, file, and account clients all talk to the same service and
//! share one connection context. Authentication is either a server API key
//! or a session secret adopted after login.

use once_cell::sync::OnceCell;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde_json::Value;

use crate::config::StoreSettings;

use super::error::InfraError;

const PROJECT_HEADER: &str = "x-appwrite-project";
const KEY_HEADER: &str = "x-appwrite-key";
const SESSION_HEADER: &str = "x-appwrite-session";

/// Connection context shared by every platform client.
pub struct PlatformClient {
    http: Client,
    base: String,
    project: String,
    api_key: Option<String>,
    session: OnceCell<String>,
}

impl PlatformClient {
    pub fn new(settings: &StoreSettings) -> Result<Self, InfraError> {
        let http = Client::builder()
            .user_agent(Self::user_agent())
            .timeout(settings.timeout)
            .build()
            .map_err(|err| {
                InfraError::configuration(format!("failed to build HTTP client: {err}"))
            })?;

        Ok(Self {
            http,
            base: settings.endpoint.as_str().trim_end_matches('/').to_string(),
            project: settings.project.clone(),
            api_key: settings.api_key.clone(),
            session: OnceCell::new(),
        })
    }

    pub fn user_agent() -> &'static str {
        concat!("pedium/", env!("CARGO_PKG_VERSION"))
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    /// Use the given session secret for every request from here on. A
    /// context adopts at most one session per process; later calls are
    /// ignored.
    pub fn adopt_session(&self, secret: String) {
        let _ = self.session.set(secret);
    }

    pub fn endpoint_url(&self, path: &str) -> String {
        format!("{}/{path}", self.base)
    }

    /// Start a request with project and auth headers applied.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut request = self
            .http
            .request(method, self.endpoint_url(path))
            .header(PROJECT_HEADER, &self.project);
        if let Some(key) = self.api_key.as_ref() {
            request = request.header(KEY_HEADER, key);
        } else if let Some(secret) = self.session.get() {
            request = request.header(SESSION_HEADER, secret);
        }
        request
    }
}

/// A non-success response, reduced to the parts error types carry.
#[derive(Debug)]
pub struct ApiFailure {
    pub status: u16,
    pub message: String,
}

/// Drain a failed response into its status and platform error message.
pub async fn read_failure(response: Response) -> ApiFailure {
    let status = response.status().as_u16();
    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&text)
        .ok()
        .and_then(|body| {
            body.get("message")
                .and_then(Value::as_str)
                .map(str::to_owned)
        })
        .unwrap_or(text);
    ApiFailure { status, message }
}
