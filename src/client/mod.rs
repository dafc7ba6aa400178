//! API client
//!
//! Resolves endpoints against the configured base URL, attaches the cached
//! token, and turns responses into [`ApiResponse`]s. Two retries exist and
//! each happens at most once per call:
//! - a transport failure (connect error, timeout) is retried once
//! - a rejected token (401, or a configured "expired" business code) forces
//!   one login and one replay of the request

mod response;

pub use response::{parse_body, ApiResponse};

use reqwest::Method;
use serde_json::Value;
use std::time::Instant;

use crate::assertions;
use crate::auth::TokenManager;
use crate::common::config::Settings;
use crate::common::{Error, Result};
use crate::store::TestDataStore;

/// Per-request options
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Query string pairs
    pub query: Vec<(String, String)>,
    /// JSON body
    pub json: Option<Value>,
    /// Extra headers
    pub headers: Vec<(String, String)>,
    /// Send without a token
    pub skip_auth: bool,
    /// Return non-2xx responses instead of failing with [`Error::Http`]
    pub allow_error_status: bool,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the JSON body
    pub fn json(mut self, body: Value) -> Self {
        self.json = Some(body);
        self
    }

    /// Add a query pair
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Add a header
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Do not attach the token
    pub fn without_auth(mut self) -> Self {
        self.skip_auth = true;
        self
    }

    /// Do not fail on non-2xx statuses
    pub fn allow_error_status(mut self) -> Self {
        self.allow_error_status = true;
        self
    }
}

/// Send a request, retrying once on transport failure
pub(crate) async fn send_with_retry(
    request: reqwest::RequestBuilder,
    method: &str,
    url: &str,
) -> Result<reqwest::Response> {
    let retry = request.try_clone();
    match request.send().await {
        Ok(response) => Ok(response),
        Err(first) => {
            let Some(retry) = retry else {
                return Err(Error::network(method, url, first));
            };
            tracing::warn!(method, url, error = %first, "Transport failure, retrying once");
            retry
                .send()
                .await
                .map_err(|e| Error::network(method, url, e))
        }
    }
}

/// Join an endpoint onto the base URL
///
/// Absolute `http://`/`https://` endpoints are used unchanged.
pub fn resolve_url(base: &str, endpoint: &str) -> String {
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        return endpoint.to_string();
    }
    let base = base.trim_end_matches('/');
    let endpoint = endpoint.trim_start_matches('/');
    if endpoint.is_empty() {
        base.to_string()
    } else {
        format!("{}/{}", base, endpoint)
    }
}

/// Client view over a run's HTTP client, settings, token manager and data
///
/// Obtained from [`crate::RunContext::client`]; it borrows the test-data
/// store mutably because a request may log in and persist a new token.
pub struct ApiClient<'a> {
    http: &'a reqwest::Client,
    settings: &'a Settings,
    auth: &'a TokenManager,
    data: &'a mut TestDataStore,
}

impl<'a> ApiClient<'a> {
    pub fn new(
        http: &'a reqwest::Client,
        settings: &'a Settings,
        auth: &'a TokenManager,
        data: &'a mut TestDataStore,
    ) -> Self {
        Self {
            http,
            settings,
            auth,
            data,
        }
    }

    /// Issue a request and parse the response
    pub async fn request(
        &mut self,
        method: Method,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<ApiResponse> {
        let url = resolve_url(&self.settings.environments.api_base_url, endpoint);

        let mut response = self.send(&method, endpoint, &url, &options, false).await?;

        if !options.skip_auth && self.token_rejected(&response) {
            tracing::info!(
                method = %method,
                endpoint,
                status = response.status,
                "Token rejected, refreshing and retrying once"
            );
            response = self.send(&method, endpoint, &url, &options, true).await?;
        }

        if !options.allow_error_status && !response.is_success() {
            return Err(Error::http(
                method.as_str(),
                endpoint,
                response.status,
                response.body_excerpt(),
            ));
        }

        Ok(response)
    }

    pub async fn get(&mut self, endpoint: &str, options: RequestOptions) -> Result<ApiResponse> {
        self.request(Method::GET, endpoint, options).await
    }

    pub async fn post(&mut self, endpoint: &str, options: RequestOptions) -> Result<ApiResponse> {
        self.request(Method::POST, endpoint, options).await
    }

    pub async fn put(&mut self, endpoint: &str, options: RequestOptions) -> Result<ApiResponse> {
        self.request(Method::PUT, endpoint, options).await
    }

    pub async fn patch(&mut self, endpoint: &str, options: RequestOptions) -> Result<ApiResponse> {
        self.request(Method::PATCH, endpoint, options).await
    }

    pub async fn delete(&mut self, endpoint: &str, options: RequestOptions) -> Result<ApiResponse> {
        self.request(Method::DELETE, endpoint, options).await
    }

    /// Issue a request, then assert the status and business code
    ///
    /// Non-2xx statuses are not errors here: the status is compared against
    /// `expected_code` like any other value.
    pub async fn request_with_assert(
        &mut self,
        method: Method,
        endpoint: &str,
        expected_code: u16,
        expected_biz_code: impl Into<Value>,
        options: RequestOptions,
    ) -> Result<ApiResponse> {
        let expected_biz_code = expected_biz_code.into();
        let response = self
            .request(method.clone(), endpoint, options.allow_error_status())
            .await?;

        assertions::assert_status(method.as_str(), endpoint, expected_code, response.status)?;
        assertions::assert_biz_code(
            method.as_str(),
            endpoint,
            &self.settings.response.code_field,
            &expected_biz_code,
            &response.body,
        )?;

        Ok(response)
    }

    /// Business code lookup using the configured envelope shape
    pub fn biz_code<'r>(&self, response: &'r ApiResponse) -> Option<&'r Value> {
        response.biz_code(&self.settings.response)
    }

    fn token_rejected(&self, response: &ApiResponse) -> bool {
        if response.status == 401 {
            return true;
        }
        let expired = &self.settings.auth.expired_codes;
        if expired.is_empty() {
            return false;
        }
        match self.biz_code(response) {
            Some(code) => expired.iter().any(|c| assertions::values_match(c, code)),
            None => false,
        }
    }

    async fn send(
        &mut self,
        method: &Method,
        endpoint: &str,
        url: &str,
        options: &RequestOptions,
        force_refresh: bool,
    ) -> Result<ApiResponse> {
        let mut request = self.http.request(method.clone(), url);

        if !options.skip_auth {
            let token = self.auth.get_token(self.data, force_refresh).await?;
            request = request.header(self.auth.header_name(), self.auth.header_value(&token));
        }
        for (name, value) in &options.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if !options.query.is_empty() {
            request = request.query(&options.query);
        }
        if let Some(body) = &options.json {
            request = request.json(body);
        }

        tracing::debug!(method = %method, url, "Sending request");

        let started = Instant::now();
        let raw = send_with_retry(request, method.as_str(), url).await?;
        let status = raw.status().as_u16();
        let text = raw
            .text()
            .await
            .map_err(|e| Error::network(method.as_str(), url, e))?;
        let elapsed = started.elapsed();

        tracing::debug!(
            method = %method,
            url,
            status,
            elapsed_ms = elapsed.as_millis() as u64,
            "Received response"
        );

        Ok(ApiResponse {
            method: method.clone(),
            endpoint: endpoint.to_string(),
            url: url.to_string(),
            status,
            body: parse_body(&text),
            elapsed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_url() {
        assert_eq!(resolve_url("https://x", "/users"), "https://x/users");
        assert_eq!(resolve_url("https://x/", "users"), "https://x/users");
        assert_eq!(resolve_url("https://x/api/", "/v1/users"), "https://x/api/v1/users");
        assert_eq!(resolve_url("https://x", ""), "https://x");
        assert_eq!(
            resolve_url("https://x", "http://other/ping"),
            "http://other/ping"
        );
    }

    #[test]
    fn test_request_options_builder() {
        let opts = RequestOptions::new()
            .query("page", "1")
            .header("X-Trace", "t")
            .json(serde_json::json!({"a": 1}))
            .without_auth()
            .allow_error_status();
        assert_eq!(opts.query, vec![("page".to_string(), "1".to_string())]);
        assert_eq!(opts.headers.len(), 1);
        assert!(opts.json.is_some());
        assert!(opts.skip_auth);
        assert!(opts.allow_error_status);
    }
}
