//! Login and token caching
//!
//! The token lives in the test-data store under [`TOKEN_KEY`], next to the
//! unix time it was obtained, so a later run can reuse it. A token that is
//! absent, older than `auth.token_ttl_secs`, or explicitly refreshed causes
//! a new login. Rejection by the server (401 or a configured "expired"
//! business code) is detected by the API client, which forces a refresh.

use serde_json::{json, Value};
use serde_yaml::{Mapping, Value as YamlValue};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::client::send_with_retry;
use crate::common::config::{Account, Settings};
use crate::common::{Error, Result};
use crate::store::{path, TestDataStore};

/// Test-data subtree owned by the token manager
pub const AUTH_SCOPE: &str = "auth";

/// Reserved test-data key holding the token
pub const TOKEN_KEY: &str = "auth.token";

/// Reserved test-data key holding the login time (unix seconds)
pub const OBTAINED_AT_KEY: &str = "auth.obtained_at";

/// Cached token state as read from the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenState {
    /// No usable token: never logged in, invalidated or expired
    NoToken,
    /// A token that may be sent
    Cached(String),
}

/// Performs logins and hands out the cached token
#[derive(Debug, Clone)]
pub struct TokenManager {
    http: reqwest::Client,
    settings: Settings,
}

impl TokenManager {
    pub fn new(http: reqwest::Client, settings: Settings) -> Self {
        Self { http, settings }
    }

    /// Inspect the cached token without logging in
    pub fn state(&self, data: &TestDataStore) -> TokenState {
        let Some(token) = data.get_str(TOKEN_KEY).filter(|t| !t.is_empty()) else {
            return TokenState::NoToken;
        };

        if let Some(ttl) = self.settings.auth.token_ttl_secs {
            let obtained_at = data
                .get(OBTAINED_AT_KEY)
                .and_then(YamlValue::as_u64)
                .unwrap_or(0);
            if now_secs().saturating_sub(obtained_at) >= ttl {
                tracing::debug!(obtained_at, ttl, "Cached token expired");
                return TokenState::NoToken;
            }
        }

        TokenState::Cached(token.to_string())
    }

    /// Return the cached token, logging in when there is none or when forced
    pub async fn get_token(&self, data: &mut TestDataStore, force_refresh: bool) -> Result<String> {
        if !force_refresh {
            if let TokenState::Cached(token) = self.state(data) {
                return Ok(token);
            }
        }

        let token = self.login().await?;

        let mut entry = Mapping::new();
        entry.insert("token".into(), YamlValue::String(token.clone()));
        entry.insert("obtained_at".into(), YamlValue::from(now_secs()));
        data.set(AUTH_SCOPE, YamlValue::Mapping(entry))?;

        Ok(token)
    }

    /// Drop the cached token
    pub fn invalidate(&self, data: &mut TestDataStore) -> Result<()> {
        data.reset(Some(AUTH_SCOPE))
    }

    /// Header value for a token, e.g. `Bearer abc`
    pub fn header_value(&self, token: &str) -> String {
        let scheme = self.settings.auth.scheme.trim();
        if scheme.is_empty() {
            token.to_string()
        } else {
            format!("{} {}", scheme, token)
        }
    }

    /// Header name the token is sent in
    pub fn header_name(&self) -> &str {
        &self.settings.auth.header
    }

    /// Call the login endpoint and extract the token
    #[tracing::instrument(skip(self))]
    async fn login(&self) -> Result<String> {
        let url = self.settings.environments.ops_login_url.as_deref().ok_or_else(|| {
            Error::Config("environments.ops_login_url is not configured".to_string())
        })?;
        let Account { username, password } = self.settings.ops_account.as_ref().ok_or_else(|| {
            Error::Config("ops_account.username/password are not configured".to_string())
        })?;

        tracing::info!(url, username = %username, "Logging in");

        let request = self
            .http
            .post(url)
            .json(&json!({ "username": username, "password": password }));

        let response = send_with_retry(request, "POST", url)
            .await
            .map_err(|e| Error::Auth {
                status: None,
                body: e.to_string(),
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| Error::Auth {
            status: Some(status.as_u16()),
            body: format!("failed to read response body: {}", e),
        })?;

        if !status.is_success() {
            return Err(Error::Auth {
                status: Some(status.as_u16()),
                body: text,
            });
        }

        let body: Value = serde_json::from_str(&text).map_err(|_| Error::Auth {
            status: Some(status.as_u16()),
            body: text.clone(),
        })?;

        let response_settings = &self.settings.response;
        if let Some(code) = path::get_json(&body, &response_settings.code_field) {
            if !crate::assertions::values_match(&response_settings.success_code, code) {
                return Err(Error::Auth {
                    status: Some(status.as_u16()),
                    body: text,
                });
            }
        }

        let token = path::get_json(&body, &self.settings.auth.token_field)
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::Auth {
                status: Some(status.as_u16()),
                body: format!(
                    "no token at '{}' in response: {}",
                    self.settings.auth.token_field, text
                ),
            })?;

        tracing::info!("Login succeeded");
        Ok(token.to_string())
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
