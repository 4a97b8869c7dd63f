//! Wire types for the authentication endpoints

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::session::ExpiresAt;
use crate::AuthError;

/// Status code the backend puts in a successful response envelope.
const ENVELOPE_OK: i64 = 200;

/// Login credentials
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub username: String,
    pub password: String,

    /// The broker system the operator wants to work against
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emqx_system_id: Option<i64>,
}

impl LoginRequest {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            emqx_system_id: None,
        }
    }

    pub fn with_system_id(mut self, system_id: i64) -> Self {
        self.emqx_system_id = Some(system_id);
        self
    }
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("emqx_system_id", &self.emqx_system_id)
            .finish()
    }
}

/// What the login endpoint hands back
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub username: String,
    pub expires_at: ExpiresAt,
}

/// The backend's `{code, message, data}` wrapper
#[derive(Debug, Deserialize)]
struct Envelope {
    code: i64,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<serde_json::Value>,
}

/// Parse a login response body, bare or wrapped in the backend envelope.
pub(crate) fn parse_login_body(body: &str) -> Result<LoginResponse, AuthError> {
    let value: serde_json::Value = serde_json::from_str(body)?;

    let payload = if value.get("code").is_some() {
        let envelope: Envelope = serde_json::from_value(value)?;
        if envelope.code != ENVELOPE_OK {
            return Err(AuthError::CredentialsRejected(
                envelope
                    .message
                    .unwrap_or_else(|| format!("login failed with code {}", envelope.code)),
            ));
        }
        envelope
            .data
            .ok_or_else(|| AuthError::ApiError("login response carried no data".to_string()))?
    } else {
        value
    };

    Ok(serde_json::from_value(payload)?)
}
