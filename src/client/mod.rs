//! Authenticated request client
//!
//! [`ApiClient`] is the single chokepoint through which the workflow talks
//! to the file-service backend. It attaches the bearer credential when one
//! is supplied, applies the configured timeout, and hands the raw response to
//! the [envelope decoder](crate::envelope).
//!
//! # Example
//!
//! ```no_run
//! use cloud_disk_e2e::client::{ApiClient, CallOptions};
//! use cloud_disk_e2e::config::ApiConfig;
//! use reqwest::Method;
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ApiClient::new(&ApiConfig::new("secret"))?;
//! let data = client
//!     .call(
//!         Method::POST,
//!         "/api/file/user/list",
//!         CallOptions::new()
//!             .bearer("token")
//!             .json(json!({"id": 0, "page": 1, "size": 50})),
//!     )
//!     .await?;
//! println!("{}", data);
//! # Ok(())
//! # }
//! ```

use crate::config::ApiConfig;
use crate::envelope::{self, Diagnostic, Outcome};
use crate::metrics;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Why a call that reached the backend was not a success
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Structured body signalling rejection
    Business,
    /// Body was not a JSON envelope
    Decode,
}

/// Client errors
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Transport error on {method} {url}: {source}")]
    Transport {
        method: Method,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Request failed ({kind:?}): {diagnostic}")]
    RequestFailed {
        kind: FailureKind,
        diagnostic: Diagnostic,
    },

    #[error("Unexpected payload from {path}: {message}")]
    UnexpectedPayload { path: String, message: String },
}

impl ClientError {
    /// Diagnostic context of a failed call, if the backend answered at all
    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            ClientError::RequestFailed { diagnostic, .. } => Some(diagnostic),
            _ => None,
        }
    }
}

/// File part of a multipart upload
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub field: String,
    pub file_name: String,
    pub mime: String,
    pub content: Bytes,
}

/// Per-call options
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    credential: Option<String>,
    json: Option<Value>,
    query: Vec<(String, String)>,
    form: Vec<(String, String)>,
    file: Option<FileUpload>,
}

impl CallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `Authorization: Bearer <token>`
    pub fn bearer(mut self, token: impl Into<String>) -> Self {
        self.credential = Some(token.into());
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.json = Some(body);
        self
    }

    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Text fields of a multipart body
    pub fn form_fields(mut self, fields: Vec<(String, String)>) -> Self {
        self.form.extend(fields);
        self
    }

    pub fn file(mut self, upload: FileUpload) -> Self {
        self.file = Some(upload);
        self
    }

    /// Bearer token attached to the call, if any
    pub fn credential(&self) -> Option<&str> {
        self.credential.as_deref()
    }

    fn is_multipart(&self) -> bool {
        self.file.is_some() || !self.form.is_empty()
    }
}

/// HTTP client for the file-service API
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
    probe_http: reqwest::Client,
}

impl ApiClient {
    /// Create a client from API configuration
    pub fn new(config: &ApiConfig) -> Result<Self, ClientError> {
        Self::with_timeouts(
            config.base_url(),
            config.request_timeout(),
            config.probe_timeout(),
        )
    }

    /// Create a client with explicit timeouts
    pub fn with_timeouts(
        base_url: &str,
        request_timeout: Duration,
        probe_timeout: Duration,
    ) -> Result<Self, ClientError> {
        let build = |timeout: Duration| {
            reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|e| ClientError::ConfigError(e.to_string()))
        };

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: build(request_timeout)?,
            probe_http: build(probe_timeout)?,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Issue a call and return the envelope's `data` on success
    ///
    /// Business and decode failures become [`ClientError::RequestFailed`]
    /// carrying the full diagnostic; the caller decides whether that is fatal.
    pub async fn call(
        &self,
        method: Method,
        path: &str,
        options: CallOptions,
    ) -> Result<Value, ClientError> {
        let url = self.url(path);
        let outcome = self.send(&self.http, method.clone(), &url, options).await?;
        match outcome {
            Outcome::Success(data) => Ok(data),
            Outcome::BusinessFailure { diagnostic, .. } => {
                let diagnostic = diagnostic.with_request(method.as_str(), &url);
                tracing::error!(
                    status = diagnostic.status,
                    headers = ?diagnostic.headers,
                    body = %diagnostic.body,
                    "{} {} rejected",
                    method,
                    path
                );
                Err(ClientError::RequestFailed {
                    kind: FailureKind::Business,
                    diagnostic,
                })
            }
            Outcome::DecodeFailure(diagnostic) => {
                let diagnostic = diagnostic.with_request(method.as_str(), &url);
                tracing::error!(
                    status = diagnostic.status,
                    headers = ?diagnostic.headers,
                    body = %diagnostic.body,
                    "{} {} returned a non-JSON body",
                    method,
                    path
                );
                Err(ClientError::RequestFailed {
                    kind: FailureKind::Decode,
                    diagnostic,
                })
            }
        }
    }

    /// Issue a call and deserialize the envelope's `data`
    pub async fn call_as<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        options: CallOptions,
    ) -> Result<T, ClientError> {
        let data = self.call(method, path, options).await?;
        serde_json::from_value(data).map_err(|e| ClientError::UnexpectedPayload {
            path: path.to_string(),
            message: e.to_string(),
        })
    }

    /// Issue a call without any credential, using the probe timeout
    ///
    /// Returns the decoded outcome as-is; rejection is not an error here.
    pub async fn call_unauthenticated(
        &self,
        method: Method,
        path: &str,
        body: Value,
    ) -> Result<Outcome, ClientError> {
        let url = self.url(path);
        self.send(&self.probe_http, method, &url, CallOptions::new().json(body))
            .await
    }

    async fn send(
        &self,
        http: &reqwest::Client,
        method: Method,
        url: &str,
        options: CallOptions,
    ) -> Result<Outcome, ClientError> {
        let endpoint = url.strip_prefix(&self.base_url).unwrap_or(url).to_string();
        let start = Instant::now();
        let transport = |source: reqwest::Error| ClientError::Transport {
            method: method.clone(),
            url: url.to_string(),
            source,
        };

        let multipart = options.is_multipart();
        let CallOptions {
            credential,
            json,
            query,
            form,
            file,
        } = options;

        let mut request = http.request(method.clone(), url);
        if let Some(token) = credential {
            request = request.bearer_auth(token);
        }
        if !query.is_empty() {
            request = request.query(&query);
        }
        if multipart {
            let mut body = Form::new();
            for (name, value) in form {
                body = body.text(name, value);
            }
            if let Some(upload) = file {
                let part = Part::bytes(upload.content.to_vec())
                    .file_name(upload.file_name)
                    .mime_str(&upload.mime)
                    .map_err(|e| ClientError::ConfigError(e.to_string()))?;
                body = body.part(upload.field, part);
            }
            request = request.multipart(body);
        } else if let Some(json) = json {
            request = request.json(&json);
        }

        tracing::debug!(method = %method, url = %url, "Sending request");

        let result = async {
            let response = request.send().await.map_err(transport)?;
            let status = response.status();
            let headers = response.headers().clone();
            let body = response.bytes().await.map_err(transport)?;
            Ok::<_, ClientError>(envelope::decode(status, &headers, &body))
        }
        .await;

        let label = match &result {
            Ok(Outcome::Success(_)) => "success",
            Ok(Outcome::BusinessFailure { .. }) => "business_failure",
            Ok(Outcome::DecodeFailure(_)) => "decode_failure",
            Err(_) => "transport_error",
        };
        metrics::record_api_call(&endpoint, label, start.elapsed().as_secs_f64());

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_strips_trailing_slash() {
        let client = ApiClient::with_timeouts(
            "http://127.0.0.1:8888/",
            Duration::from_secs(60),
            Duration::from_secs(30),
        )
        .unwrap();
        assert_eq!(client.base_url(), "http://127.0.0.1:8888");
        assert_eq!(
            client.url("/api/users/login"),
            "http://127.0.0.1:8888/api/users/login"
        );
    }

    #[test]
    fn test_call_options_multipart_detection() {
        assert!(!CallOptions::new().json(serde_json::json!({})).is_multipart());
        assert!(CallOptions::new()
            .form_fields(vec![("name".into(), "a.txt".into())])
            .is_multipart());
        assert!(CallOptions::new()
            .file(FileUpload {
                field: "file".into(),
                file_name: "a.txt".into(),
                mime: "text/plain".into(),
                content: Bytes::from_static(b"a"),
            })
            .is_multipart());
    }

    #[test]
    fn test_diagnostic_only_for_request_failures() {
        let err = ClientError::RequestFailed {
            kind: FailureKind::Business,
            diagnostic: Diagnostic {
                status: 400,
                ..Diagnostic::default()
            },
        };
        assert_eq!(err.diagnostic().map(|d| d.status), Some(400));

        let err = ClientError::ConfigError("bad".into());
        assert!(err.diagnostic().is_none());
    }
}
