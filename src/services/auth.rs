//! Identity provider client
//!
//! Sign-in is delegated entirely to the data store's auth endpoint; this
//! module only exchanges credentials for a [`Session`] and turns rejections
//! into a displayable message.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::{PharmwatchError, Result, Session};

#[derive(Serialize)]
struct PasswordGrantRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    user: Option<TokenUser>,
}

#[derive(Deserialize)]
struct TokenUser {
    #[serde(default)]
    email: Option<String>,
}

/// Error body shapes returned by the auth endpoint
#[derive(Deserialize, Default)]
struct AuthErrorBody {
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl AuthErrorBody {
    fn into_message(self) -> Option<String> {
        self.error_description.or(self.msg).or(self.message)
    }
}

pub struct AuthClient {
    base_url: String,
    anon_key: String,
    client: reqwest::Client,
}

impl AuthClient {
    pub fn new(base_url: &str, anon_key: &str, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| PharmwatchError::Http(format!("HTTP client error: {}", e)))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
            client,
        })
    }

    /// Exchange email and password for a session
    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session> {
        let url = format!("{}/auth/v1/token", self.base_url);

        let response = self
            .client
            .post(&url)
            .query(&[("grant_type", "password")])
            .header("apikey", &self.anon_key)
            .json(&PasswordGrantRequest { email, password })
            .send()
            .await
            .map_err(|e| PharmwatchError::Auth(format!("identity provider unreachable: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PharmwatchError::Auth(e.to_string()))?;

        if !status.is_success() {
            let message = parse_auth_error(&body)
                .unwrap_or_else(|| format!("sign-in failed with HTTP {}", status.as_u16()));
            tracing::warn!(status = status.as_u16(), "sign-in rejected");
            return Err(PharmwatchError::Auth(message));
        }

        let session = parse_token_response(&body, email)?;
        tracing::info!(email, "signed in");
        Ok(session)
    }
}

fn parse_auth_error(body: &str) -> Option<String> {
    serde_json::from_str::<AuthErrorBody>(body)
        .ok()
        .and_then(AuthErrorBody::into_message)
}

fn parse_token_response(body: &str, email: &str) -> Result<Session> {
    let token: TokenResponse = serde_json::from_str(body)
        .map_err(|e| PharmwatchError::Auth(format!("invalid token response: {}", e)))?;

    Ok(Session {
        access_token: token.access_token,
        email: token
            .user
            .and_then(|u| u.email)
            .or_else(|| Some(email.to_string())),
    })
}
