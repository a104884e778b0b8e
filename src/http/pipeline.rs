//! Shared HTTP client with request/response interception.
//!
//! ARCHITECTURE
//! ============
//! `send` runs three stages around the raw `reqwest` call:
//! 1. request interception: attach the stored credential under
//!    [`AUTH_HEADER`] and default the content type to JSON unless the body is
//!    a multipart form or the caller set one explicitly;
//! 2. dispatch with the configured timeout;
//! 3. response interception: parse the body and hand back the payload, or
//!    classify the failure, post exactly one notice, and return the error.

use std::time::Duration;

use reqwest::Method;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;

use super::error::{ApiError, classify_status, classify_transport};
use crate::config::ClientConfig;
use crate::credential::CredentialStore;
use crate::signal::{Notice, SignalBus};

/// Header the backend's JWT interceptor reads the credential from.
pub const AUTH_HEADER: &str = "authentication";
pub const JSON_CONTENT_TYPE: &str = "application/json;charset=utf-8";

pub enum RequestBody {
    Empty,
    Json(Value),
    /// Sent as-is; `reqwest` supplies the boundary content type.
    Multipart(reqwest::multipart::Form),
}

/// One request relative to the configured API base.
pub struct PipelineRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    headers: HeaderMap,
    body: RequestBody,
}

impl PipelineRequest {
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: RequestBody::Empty,
        }
    }

    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    #[must_use]
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    #[must_use]
    pub fn json(mut self, body: Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    #[must_use]
    pub fn multipart(mut self, form: reqwest::multipart::Form) -> Self {
        self.body = RequestBody::Multipart(form);
        self
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }
}

pub struct HttpPipeline {
    client: reqwest::Client,
    base_url: String,
    credentials: CredentialStore,
    signals: SignalBus,
}

impl HttpPipeline {
    /// Build the shared client from config.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::ClientBuild`] if the underlying client cannot be built.
    pub fn new(config: &ClientConfig, credentials: CredentialStore, signals: SignalBus) -> Result<Self, ApiError> {
        Self::with_timeout(&config.api_base_url, config.request_timeout, credentials, signals)
    }

    /// Build against an explicit base URL and timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::ClientBuild`] if the underlying client cannot be built.
    pub fn with_timeout(
        base_url: &str,
        timeout: Duration,
        credentials: CredentialStore,
        signals: SignalBus,
    ) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::ClientBuild(e.to_string()))?;
        Ok(Self { client, base_url: base_url.trim_end_matches('/').to_owned(), credentials, signals })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    #[must_use]
    pub fn signals(&self) -> &SignalBus {
        &self.signals
    }

    /// Absolute URL for a path under the API base.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}/{path}", self.base_url)
        }
    }

    /// Send a request and return the parsed response payload.
    ///
    /// # Errors
    ///
    /// Returns the classified [`ApiError`]; a notice has already been posted
    /// on the signal bus by the time the caller sees it.
    pub async fn send(&self, request: PipelineRequest) -> Result<Value, ApiError> {
        let method = request.method.clone();
        let path = request.path.clone();
        match self.dispatch(request).await {
            Ok(payload) => Ok(payload),
            Err(err) => {
                tracing::warn!(%method, %path, kind = ?err.kind(), error = %err, "request failed");
                self.signals.notify(Notice::http_failure(err.kind(), err.user_message()));
                Err(err)
            }
        }
    }

    /// Request interception: credential header and content-type default.
    pub(crate) fn intercept_request(&self, headers: &mut HeaderMap, body: &RequestBody) {
        if let Some(token) = self.credentials.get().filter(|t| !t.is_empty()) {
            match HeaderValue::from_str(&token) {
                Ok(value) => {
                    headers.insert(HeaderName::from_static(AUTH_HEADER), value);
                }
                Err(_) => tracing::warn!("stored credential is not a valid header value; sending without it"),
            }
        }

        if !headers.contains_key(CONTENT_TYPE) && !matches!(body, RequestBody::Multipart(_)) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
        }
    }

    async fn dispatch(&self, request: PipelineRequest) -> Result<Value, ApiError> {
        let PipelineRequest { method, path, query, mut headers, body } = request;
        self.intercept_request(&mut headers, &body);

        let mut builder = self.client.request(method, self.url(&path)).headers(headers);
        if !query.is_empty() {
            builder = builder.query(&query);
        }
        builder = match body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.body(serde_json::to_vec(&value)?),
            RequestBody::Multipart(form) => builder.multipart(form),
        };

        let response = builder.send().await.map_err(classify_transport)?;
        let status = response.status();
        let text = response.text().await.map_err(classify_transport)?;

        if !status.is_success() {
            let body = parse_body(&text).unwrap_or(Value::String(text));
            return Err(classify_status(status.as_u16(), body));
        }

        Ok(parse_body(&text)?)
    }
}

/// Response interception: bodies always arrive as text; an empty body is
/// `null`, anything else must be JSON.
pub(crate) fn parse_body(text: &str) -> Result<Value, serde_json::Error> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(text)
}

#[cfg(test)]
#[path = "pipeline_test.rs"]
mod tests;
