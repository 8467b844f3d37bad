//! Account and session client for the platform's identity API.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{Value, json};
use tracing::debug;

use crate::application::collaborators::{Account, IdentityError, IdentityProvider, Session};

use super::client::{PlatformClient, read_failure};

pub struct HttpIdentityProvider {
    platform: Arc<PlatformClient>,
}

impl HttpIdentityProvider {
    pub fn new(platform: Arc<PlatformClient>) -> Self {
        Self { platform }
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn current_account(&self) -> Result<Option<Account>, IdentityError> {
        let response = self
            .platform
            .request(Method::GET, "account")
            .send()
            .await
            .map_err(|err| IdentityError::Transport(err.to_string()))?;

        if response.status().as_u16() == 401 {
            return Ok(None);
        }
        if !response.status().is_success() {
            let failure = read_failure(response).await;
            return Err(IdentityError::Rejected {
                status: failure.status,
                message: failure.message,
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|err| IdentityError::Decode(err.to_string()))?;
        parse_account(&body).map(Some)
    }

    async fn create_account(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<Account, IdentityError> {
        let response = self
            .platform
            .request(Method::POST, "account")
            .json(&json!({
                "userId": "unique()",
                "email": email,
                "password": password,
                "name": name,
            }))
            .send()
            .await
            .map_err(|err| IdentityError::Transport(err.to_string()))?;

        if !response.status().is_success() {
            let failure = read_failure(response).await;
            return Err(IdentityError::Rejected {
                status: failure.status,
                message: failure.message,
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|err| IdentityError::Decode(err.to_string()))?;
        parse_account(&body)
    }

    async fn create_session(&self, email: &str, password: &str) -> Result<Session, IdentityError> {
        debug!(email, "opening session");
        let response = self
            .platform
            .request(Method::POST, "account/sessions/email")
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(|err| IdentityError::Transport(err.to_string()))?;

        if !response.status().is_success() {
            let failure = read_failure(response).await;
            return Err(IdentityError::Rejected {
                status: failure.status,
                message: failure.message,
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|err| IdentityError::Decode(err.to_string()))?;
        let id = body
            .get("$id")
            .and_then(Value::as_str)
            .ok_or_else(|| IdentityError::Decode("session has no `$id`".to_string()))?
            .to_string();
        let secret = body
            .get("secret")
            .and_then(Value::as_str)
            .ok_or_else(|| IdentityError::Decode("session has no `secret`".to_string()))?
            .to_string();

        // Later requests in this process authenticate as the new session.
        self.platform.adopt_session(secret.clone());

        Ok(Session { id, secret })
    }

    async fn delete_session(&self) -> Result<(), IdentityError> {
        debug!("closing current session");
        let response = self
            .platform
            .request(Method::DELETE, "account/sessions/current")
            .send()
            .await
            .map_err(|err| IdentityError::Transport(err.to_string()))?;

        if response.status().as_u16() == 401 {
            return Err(IdentityError::Unauthorized);
        }
        if !response.status().is_success() {
            let failure = read_failure(response).await;
            return Err(IdentityError::Rejected {
                status: failure.status,
                message: failure.message,
            });
        }
        Ok(())
    }
}

fn parse_account(body: &Value) -> Result<Account, IdentityError> {
    let id = body
        .get("$id")
        .and_then(Value::as_str)
        .ok_or_else(|| IdentityError::Decode("account has no `$id`".to_string()))?
        .to_string();
    let name = body
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let email = body
        .get("email")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    Ok(Account { id, name, email })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use httpmock::MockServer;
    use serde_json::json;

    use crate::config::StoreSettings;

    use super::*;

    fn provider(server: &MockServer) -> (HttpIdentityProvider, Arc<PlatformClient>) {
        let settings = StoreSettings {
            endpoint: url::Url::parse(&server.base_url()).expect("mock url"),
            project: "test-project".to_string(),
            api_key: None,
            database: "pedium_db".to_string(),
            bucket: "images".to_string(),
            timeout: std::time::Duration::from_secs(5),
        };
        let platform = Arc::new(PlatformClient::new(&settings).expect("platform client"));
        (HttpIdentityProvider::new(Arc::clone(&platform)), platform)
    }

    #[tokio::test]
    async fn current_account_maps_unauthorized_to_none() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method("GET").path("/account");
            then.status(401)
                .header("content-type", "application/json")
                .json_body(json!({ "message": "User (role: guests) missing scope (account)" }));
        });

        let (provider, _) = provider(&server);
        let account = provider.current_account().await.expect("current account");
        assert!(account.is_none());
    }

    #[tokio::test]
    async fn create_session_adopts_the_secret_for_later_requests() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method("POST")
                .path("/account/sessions/email")
                .json_body(json!({ "email": "jane@example.com", "password": "hunter22" }));
            then.status(201)
                .header("content-type", "application/json")
                .json_body(json!({ "$id": "s1", "secret": "session-secret" }));
        });
        let account_mock = server.mock(|when, then| {
            when.method("GET")
                .path("/account")
                .header("x-appwrite-session", "session-secret");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({
                    "$id": "u1",
                    "name": "Jane",
                    "email": "jane@example.com",
                }));
        });

        let (provider, _) = provider(&server);
        let session = provider
            .create_session("jane@example.com", "hunter22")
            .await
            .expect("session");
        assert_eq!(session.secret, "session-secret");

        let account = provider
            .current_account()
            .await
            .expect("current account")
            .expect("signed in");
        account_mock.assert();
        assert_eq!(account.id, "u1");
        assert_eq!(account.name, "Jane");
    }

    #[tokio::test]
    async fn create_account_sends_server_generated_id() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method("POST").path("/account").json_body(json!({
                "userId": "unique()",
                "email": "jane@example.com",
                "password": "hunter22",
                "name": "Jane",
            }));
            then.status(201)
                .header("content-type", "application/json")
                .json_body(json!({
                    "$id": "u1",
                    "name": "Jane",
                    "email": "jane@example.com",
                }));
        });

        let (provider, _) = provider(&server);
        let account = provider
            .create_account("jane@example.com", "hunter22", "Jane")
            .await
            .expect("account");

        mock.assert();
        assert_eq!(account.id, "u1");
    }

    #[tokio::test]
    async fn duplicate_email_surfaces_the_rejection() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method("POST").path("/account");
            then.status(409)
                .header("content-type", "application/json")
                .json_body(json!({
                    "message": "A user with the same id, email, or phone already exists",
                    "code": 409,
                }));
        });

        let (provider, _) = provider(&server);
        let err = provider
            .create_account("jane@example.com", "hunter22", "Jane")
            .await
            .expect_err("duplicate account");

        match err {
            IdentityError::Rejected { status, message } => {
                assert_eq!(status, 409);
                assert!(message.contains("already exists"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
