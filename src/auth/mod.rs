//! Authentication module
//!
//! Login against the backend and the negative-auth probe that proves the
//! authorization gate is active before any later "success" is trusted.

use crate::client::{ApiClient, CallOptions, ClientError};
use crate::envelope::Outcome;
use crate::model::LoginResponse;
use reqwest::Method;
use serde_json::{json, Value};
use thiserror::Error;

/// Login endpoint
pub const LOGIN_PATH: &str = "/api/users/login";

/// Authentication errors
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Login response did not contain a token")]
    MissingToken,

    #[error("Unauthenticated {method} {path} succeeded; authorization gate is not enforced")]
    AuthBypassDetected { method: Method, path: String },

    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Bearer credential for one run
///
/// Immutable once acquired; dropped when the run ends.
#[derive(Clone)]
pub struct Session {
    token: String,
    username: String,
}

impl Session {
    pub fn new(token: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            username: username.into(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Call options carrying this session's bearer credential
    pub fn options(&self) -> CallOptions {
        CallOptions::new().bearer(self.token.clone())
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("username", &self.username)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Submit credentials and extract the bearer token
#[tracing::instrument(name = "auth.login", skip(client, password), err)]
pub async fn login(client: &ApiClient, username: &str, password: &str) -> Result<Session, AuthError> {
    let response: LoginResponse = client
        .call_as(
            Method::POST,
            LOGIN_PATH,
            CallOptions::new().json(json!({"name": username, "password": password})),
        )
        .await?;

    let token = response
        .token
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::MissingToken)?;

    Ok(Session::new(token, response.name.unwrap_or_else(|| username.to_string())))
}

/// Issues calls without a credential and requires them to be rejected
pub struct NegativeAuthProber<'a> {
    client: &'a ApiClient,
}

impl<'a> NegativeAuthProber<'a> {
    pub fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// Succeed iff the unauthenticated call does not decode as a success
    ///
    /// Transport failures are still errors: an unreachable backend proves nothing.
    pub async fn assert_rejected(
        &self,
        method: Method,
        path: &str,
        body: Value,
    ) -> Result<(), AuthError> {
        let outcome = self
            .client
            .call_unauthenticated(method.clone(), path, body)
            .await?;

        match outcome {
            Outcome::Success(_) => Err(AuthError::AuthBypassDetected {
                method,
                path: path.to_string(),
            }),
            rejected => {
                let status = rejected.diagnostic().map(|d| d.status).unwrap_or_default();
                tracing::info!(status, "Unauthenticated {} {} rejected as expected", method, path);
                Ok(())
            }
        }
    }
}
