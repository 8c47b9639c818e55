//! Response envelope decoding
//!
//! Every backend endpoint answers with `{"code": <int>, "msg": <str>, "data": <any>}`.
//! A call only counts as successful when the HTTP status is exactly 200 and
//! `code` equals [`SUCCESS_CODE`]. Anything else is turned into an [`Outcome`]
//! that carries a [`Diagnostic`] for the caller to report.

use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;

/// Sentinel value of the envelope's `code` field on success
pub const SUCCESS_CODE: i64 = 0;

/// Decoded response envelope
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    pub code: i64,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub data: Value,
}

/// Everything needed to explain a failed call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostic {
    pub method: String,
    pub url: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Diagnostic {
    /// Attach the request line that produced this response
    pub fn with_request(mut self, method: &str, url: &str) -> Self {
        self.method = method.to_string();
        self.url = url.to_string();
        self
    }

    /// Envelope message, when the body decodes as an envelope
    pub fn message(&self) -> Option<String> {
        serde_json::from_str::<Envelope>(&self.body)
            .ok()
            .and_then(|envelope| envelope.msg)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.method.is_empty() {
            write!(f, "{} {} -> ", self.method, self.url)?;
        }
        write!(f, "status {}", self.status)?;
        if !self.headers.is_empty() {
            let headers: Vec<String> = self
                .headers
                .iter()
                .map(|(name, value)| format!("{}: {}", name, value))
                .collect();
            write!(f, ", headers {{{}}}", headers.join(", "))?;
        }
        write!(f, ", body {}", self.body)
    }
}

/// Result of decoding a raw response
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// HTTP 200 and the success sentinel; holds the envelope's `data`
    Success(Value),
    /// Structured body, but the status or the sentinel signals rejection
    BusinessFailure {
        code: Option<i64>,
        diagnostic: Diagnostic,
    },
    /// Body is not a JSON envelope at all
    DecodeFailure(Diagnostic),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    /// Diagnostic context for a failed outcome
    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            Outcome::Success(_) => None,
            Outcome::BusinessFailure { diagnostic, .. } => Some(diagnostic),
            Outcome::DecodeFailure(diagnostic) => Some(diagnostic),
        }
    }
}

/// Decode a raw response into an [`Outcome`]
pub fn decode(status: StatusCode, headers: &HeaderMap, body: &[u8]) -> Outcome {
    let diagnostic = || Diagnostic {
        status: status.as_u16(),
        headers: headers
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect(),
        body: String::from_utf8_lossy(body).into_owned(),
        ..Diagnostic::default()
    };

    let value: Value = match serde_json::from_slice(body) {
        Ok(value) => value,
        Err(_) => return Outcome::DecodeFailure(diagnostic()),
    };

    match serde_json::from_value::<Envelope>(value) {
        Ok(envelope) if status == StatusCode::OK && envelope.code == SUCCESS_CODE => {
            Outcome::Success(envelope.data)
        }
        Ok(envelope) => Outcome::BusinessFailure {
            code: Some(envelope.code),
            diagnostic: diagnostic(),
        },
        // Valid JSON without an envelope shape is still a structured rejection
        Err(_) => Outcome::BusinessFailure {
            code: None,
            diagnostic: diagnostic(),
        },
    }
}
