use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::config::Settings;

#[derive(Debug, Error)]
pub(crate) enum SecurityError {
    #[error("token verification is not configured")]
    NotConfigured,
    #[error("jwt decoding failed")]
    JwtDecoding,
}

/// Claims carried by identity-provider access tokens. Only `sub` is relied on.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Claims {
    pub(crate) sub: String,
    pub(crate) exp: i64,
    #[serde(default)]
    pub(crate) aud: Option<String>,
    #[serde(default)]
    pub(crate) email: Option<String>,
    #[serde(default)]
    pub(crate) role: Option<String>,
}

pub(crate) fn verify_token(token: &str, settings: &Settings) -> Result<Claims, SecurityError> {
    let secret = &settings.auth().jwt_secret;
    if secret.is_empty() {
        return Err(SecurityError::NotConfigured);
    }

    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    validation.set_audience(&[settings.auth().jwt_audience.as_str()]);
    validation.required_spec_claims.insert("exp".to_string());
    validation.required_spec_claims.insert("sub".to_string());

    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
        .map_err(|_| SecurityError::JwtDecoding)
}

pub(crate) fn bearer_token(header_value: &str) -> Option<&str> {
    let (scheme, token) = header_value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;

    #[tokio::test]
    async fn verifies_tokens_signed_with_project_secret() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();
        let settings = Settings::load().expect("settings");

        let token = test_support::issue_token("user-123", &settings);
        let claims = verify_token(&token, &settings).expect("claims");

        assert_eq!(claims.sub, "user-123");
        assert_eq!(claims.aud.as_deref(), Some("authenticated"));
    }

    #[tokio::test]
    async fn rejects_foreign_audience_and_secret() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();
        let settings = Settings::load().expect("settings");

        let wrong_audience =
            test_support::issue_token_with("user-1", "anon", "test-jwt-secret", 3600);
        let wrong_secret =
            test_support::issue_token_with("user-1", "authenticated", "other-secret", 3600);
        let expired =
            test_support::issue_token_with("user-1", "authenticated", "test-jwt-secret", -3600);

        assert!(verify_token(&wrong_audience, &settings).is_err());
        assert!(verify_token(&wrong_secret, &settings).is_err());
        assert!(verify_token(&expired, &settings).is_err());
    }

    #[test]
    fn bearer_token_parsing() {
        assert_eq!(bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(bearer_token("bearer  abc "), Some("abc"));
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("abc"), None);
    }
}
