use std::time::Duration;

use anyhow::Context;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::core::config::Settings;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Error)]
pub(crate) enum IdentityError {
    #[error("identity provider is not configured")]
    NotConfigured,
    #[error("{0}")]
    Rejected(String),
    #[error("identity provider returned {status}: {message}")]
    Upstream { status: StatusCode, message: String },
    #[error("identity provider request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected identity provider reply: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct IdentityUser {
    pub(crate) id: String,
    #[serde(default)]
    pub(crate) email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct IdentitySession {
    pub(crate) access_token: String,
    pub(crate) user: IdentityUser,
}

/// Supabase Auth (GoTrue) REST client for account creation and password sign-in.
///
/// Admin calls carry the service-role key. Tokens it hands out are the same
/// HS256 tokens the request guards verify.
#[derive(Debug, Clone)]
pub(crate) struct IdentityClient {
    client: Client,
    base_url: String,
    service_key: String,
}

impl IdentityClient {
    pub(crate) fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let auth = settings.auth();
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build identity HTTP client")?;

        Ok(Self {
            client,
            base_url: auth.supabase_url.trim_end_matches('/').to_string(),
            service_key: auth.service_role_key.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<String, IdentityError> {
        if self.base_url.is_empty() || self.service_key.is_empty() {
            return Err(IdentityError::NotConfigured);
        }
        Ok(format!("{}/auth/v1{path}", self.base_url))
    }

    fn with_service_key(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.header("apikey", &self.service_key).bearer_auth(&self.service_key)
    }

    /// Creates a pre-confirmed account.
    pub(crate) async fn create_user(
        &self,
        email: &str,
        password: &str,
    ) -> Result<IdentityUser, IdentityError> {
        let url = self.endpoint("/admin/users")?;
        let response = self
            .with_service_key(self.client.post(url))
            .json(&json!({"email": email, "password": password, "email_confirm": true}))
            .send()
            .await?;

        read_reply(response).await
    }

    pub(crate) async fn delete_user(&self, user_id: &str) -> Result<(), IdentityError> {
        let url = self.endpoint(&format!("/admin/users/{user_id}"))?;
        let response = self.with_service_key(self.client.delete(url)).send().await?;

        read_reply::<Value>(response).await.map(|_| ())
    }

    pub(crate) async fn sign_in(
        &self,
        email: &str,
        password: &str,
    ) -> Result<IdentitySession, IdentityError> {
        let url = self.endpoint("/token?grant_type=password")?;
        let response = self
            .client
            .post(url)
            .header("apikey", &self.service_key)
            .json(&json!({"email": email, "password": password}))
            .send()
            .await?;

        read_reply(response).await
    }
}

async fn read_reply<T: DeserializeOwned>(response: Response) -> Result<T, IdentityError> {
    let status = response.status();
    let body: Value = response.json().await.unwrap_or(Value::Null);

    if status.is_success() {
        return Ok(serde_json::from_value(body)?);
    }

    let message = error_message(&body).unwrap_or_else(|| status.to_string());
    if status.is_client_error() {
        Err(IdentityError::Rejected(message))
    } else {
        Err(IdentityError::Upstream { status, message })
    }
}

/// GoTrue spreads its error text over several field names depending on the endpoint.
fn error_message(body: &Value) -> Option<String> {
    ["msg", "error_description", "message", "error"]
        .iter()
        .find_map(|key| body.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{spawn_identity_stub, IDENTITY_SERVICE_KEY};

    fn client(base_url: &str, service_key: &str) -> IdentityClient {
        IdentityClient {
            client: Client::new(),
            base_url: base_url.to_string(),
            service_key: service_key.to_string(),
        }
    }

    #[test]
    fn error_message_prefers_provider_text() {
        let taken = json!({"msg": "User already registered"});
        let bad_grant = json!({"error": "invalid_grant", "error_description": "Invalid login credentials"});

        assert_eq!(error_message(&taken).as_deref(), Some("User already registered"));
        assert_eq!(error_message(&bad_grant).as_deref(), Some("Invalid login credentials"));
        assert_eq!(error_message(&Value::Null), None);
    }

    #[tokio::test]
    async fn create_user_returns_provider_id() {
        let stub = spawn_identity_stub().await;
        let identity = client(&stub.base_url, IDENTITY_SERVICE_KEY);

        let user = identity.create_user("new@example.com", "correct-horse").await.expect("user");

        assert_eq!(user.id, "user-new");
        assert_eq!(user.email.as_deref(), Some("new@example.com"));
    }

    #[tokio::test]
    async fn duplicate_account_is_rejected_with_provider_message() {
        let stub = spawn_identity_stub().await;
        let identity = client(&stub.base_url, IDENTITY_SERVICE_KEY);

        let err =
            identity.create_user("taken@example.com", "correct-horse").await.expect_err("taken");

        assert!(
            matches!(err, IdentityError::Rejected(ref message) if message == "User already registered")
        );
    }

    #[tokio::test]
    async fn wrong_service_key_is_rejected() {
        let stub = spawn_identity_stub().await;
        let identity = client(&stub.base_url, "not-the-key");

        let err =
            identity.create_user("new@example.com", "correct-horse").await.expect_err("forbidden");

        assert!(matches!(err, IdentityError::Rejected(_)));
    }

    #[tokio::test]
    async fn sign_in_returns_session_or_rejection() {
        let stub = spawn_identity_stub().await;
        let identity = client(&stub.base_url, IDENTITY_SERVICE_KEY);

        let session = identity.sign_in("new@example.com", "correct-horse").await.expect("session");
        assert_eq!(session.user.id, "user-new");
        assert!(!session.access_token.is_empty());

        let err = identity.sign_in("new@example.com", "wrong").await.expect_err("bad password");
        assert!(
            matches!(err, IdentityError::Rejected(ref message) if message == "Invalid login credentials")
        );
    }

    #[tokio::test]
    async fn delete_user_reaches_admin_endpoint() {
        let stub = spawn_identity_stub().await;
        let identity = client(&stub.base_url, IDENTITY_SERVICE_KEY);

        identity.delete_user("user-new").await.expect("deleted");

        assert_eq!(stub.deleted(), vec!["user-new".to_string()]);
    }

    #[tokio::test]
    async fn unconfigured_client_makes_no_calls() {
        let identity = client("", "");

        let err =
            identity.sign_in("new@example.com", "correct-horse").await.expect_err("unconfigured");

        assert!(matches!(err, IdentityError::NotConfigured));
    }

    #[tokio::test]
    async fn provider_outage_is_not_a_rejection() {
        let identity = client("http://127.0.0.1:9", IDENTITY_SERVICE_KEY);

        let err =
            identity.sign_in("new@example.com", "correct-horse").await.expect_err("unreachable");

        assert!(matches!(err, IdentityError::Transport(_)));
    }
}
