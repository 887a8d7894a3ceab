//! Shared HTTP plumbing for the collaborator clients.
//!
//! Wraps one [`reqwest::Client`] with the backend base URL and the session's
//! CSRF token, and centralizes status checking and JSON decoding.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Header carrying the session's CSRF token on every request.
pub const CSRF_HEADER: &str = "X-CSRF-Token";

/// Standard `{ "data": T }` response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct DataResponse<T> {
    pub data: T,
}

/// HTTP client for the back-office API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    csrf_token: Option<String>,
}

impl ApiClient {
    /// Create a client with its own connection pool.
    ///
    /// * `base_url` - API root, e.g. `http://host:8000/api`.
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        csrf_token: Option<String>,
    ) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url, csrf_token))
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(
        client: reqwest::Client,
        base_url: impl Into<String>,
        csrf_token: Option<String>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            base_url,
            csrf_token,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn has_csrf_token(&self) -> bool {
        self.csrf_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// `GET {base}/{path}` with query pairs, decoding a JSON body.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let response = self
            .authorized(self.client.get(self.url(path)))
            .query(query)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// `POST {base}/{path}` with a JSON body, decoding a JSON body.
    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let response = self
            .authorized(self.client.post(self.url(path)))
            .json(body)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    // ---- private helpers ----

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.csrf_token {
            Some(token) => builder.header(CSRF_HEADER, token),
            None => builder,
        }
    }

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or an [`ApiError::Api`] containing
    /// the status and body text on failure.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ApiError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}
