//! Session state for the console

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::AuthError;

/// Formats the backend uses for timestamps without an offset (read as UTC).
const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"];

/// Absolute token expiry, in epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ExpiresAt(i64);

impl ExpiresAt {
    pub fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        Self(at.timestamp_millis())
    }

    pub fn as_millis(self) -> i64 {
        self.0
    }

    /// Parse a timestamp as the backend or durable storage hands it over.
    ///
    /// Accepts epoch milliseconds (`"1735689600000"`), RFC 3339 strings
    /// (`"2025-01-01T00:00:00Z"`) and the backend's `yyyy-MM-dd HH:mm:ss`
    /// format. Relative durations are not accepted: a bare number is always
    /// an absolute instant.
    pub fn parse(raw: &str) -> Result<Self, AuthError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(AuthError::InvalidExpiry("empty timestamp".to_string()));
        }

        if let Ok(millis) = raw.parse::<i64>() {
            return Ok(Self(millis));
        }

        if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
            return Ok(Self(at.timestamp_millis()));
        }

        for format in NAIVE_FORMATS {
            if let Ok(at) = NaiveDateTime::parse_from_str(raw, format) {
                return Ok(Self(at.and_utc().timestamp_millis()));
            }
        }

        Err(AuthError::InvalidExpiry(raw.to_string()))
    }

    /// True once `now` has reached the expiry instant.
    pub fn is_expired_at(self, now: DateTime<Utc>) -> bool {
        now.timestamp_millis() >= self.0
    }

    /// The value written under the `expiresAt` storage key.
    pub fn to_storage_string(self) -> String {
        self.0.to_string()
    }
}

impl fmt::Display for ExpiresAt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match DateTime::<Utc>::from_timestamp_millis(self.0) {
            Some(at) => write!(f, "{}", at.to_rfc3339()),
            None => write!(f, "{}ms", self.0),
        }
    }
}

impl<'de> Deserialize<'de> for ExpiresAt {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Millis(i64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Millis(millis) => Ok(Self(millis)),
            Raw::Text(text) => Self::parse(&text).map_err(serde::de::Error::custom),
        }
    }
}

/// An authenticated identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// The bearer token
    pub token: String,

    /// The principal's display name
    pub username: String,

    /// When the token stops being valid
    pub expires_at: ExpiresAt,
}

impl Session {
    pub fn new(
        token: impl Into<String>,
        username: impl Into<String>,
        expires_at: ExpiresAt,
    ) -> Self {
        Self {
            token: token.into(),
            username: username.into(),
            expires_at,
        }
    }

    /// Check if the session has expired
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_expired_at(Utc::now())
    }

    /// A session is usable when it carries a token that has not expired at `now`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.token.is_empty() && !self.expires_at.is_expired_at(now)
    }

    pub fn authorization_header(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

/// The two logical states of the console session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Anonymous,
    Authenticated(Session),
}

impl SessionState {
    /// Never true for a session with an empty token.
    pub fn is_logged_in(&self) -> bool {
        matches!(self, SessionState::Authenticated(session) if !session.token.is_empty())
    }

    pub fn session(&self) -> Option<&Session> {
        match self {
            SessionState::Authenticated(session) => Some(session),
            SessionState::Anonymous => None,
        }
    }

    pub fn username(&self) -> &str {
        self.session().map_or("", |s| s.username.as_str())
    }

    pub fn authorization_header(&self) -> Option<String> {
        self.session()
            .filter(|s| !s.token.is_empty())
            .map(Session::authorization_header)
    }
}

/// Read-only view handed to the rest of the application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub is_logged_in: bool,
    pub username: String,
}

impl From<&SessionState> for SessionSnapshot {
    fn from(state: &SessionState) -> Self {
        Self {
            is_logged_in: state.is_logged_in(),
            username: state.username().to_string(),
        }
    }
}

// A panicking writer cannot leave a half-written state behind (writes are
// whole-value replacements), so a poisoned lock is still safe to use.
pub(crate) fn read_state(state: &RwLock<SessionState>) -> RwLockReadGuard<'_, SessionState> {
    state.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn write_state(state: &RwLock<SessionState>) -> RwLockWriteGuard<'_, SessionState> {
    state.write().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_parse_epoch_millis() {
        let expiry = ExpiresAt::parse("1735689600000").unwrap();
        assert_eq!(expiry.as_millis(), 1_735_689_600_000);
    }

    #[test]
    fn test_parse_rfc3339() {
        let expiry = ExpiresAt::parse("2025-01-01T08:00:00+08:00").unwrap();
        let expected = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(expiry, ExpiresAt::from_datetime(expected));
    }

    #[test]
    fn test_parse_backend_format_as_utc() {
        let expiry = ExpiresAt::parse("2025-01-01 00:00:00").unwrap();
        let expected = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(expiry, ExpiresAt::from_datetime(expected));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(ExpiresAt::parse(""), Err(AuthError::InvalidExpiry(_))));
        assert!(matches!(ExpiresAt::parse("tomorrow"), Err(AuthError::InvalidExpiry(_))));
        assert!(matches!(ExpiresAt::parse("1h"), Err(AuthError::InvalidExpiry(_))));
    }

    #[test]
    fn test_deserialize_number_or_string() {
        let from_number: ExpiresAt = serde_json::from_str("1735689600000").unwrap();
        let from_string: ExpiresAt = serde_json::from_str("\"2025-01-01T00:00:00Z\"").unwrap();
        assert_eq!(from_number, from_string);
        assert!(serde_json::from_str::<ExpiresAt>("\"soon\"").is_err());
    }

    #[test]
    fn test_expiry_boundary_is_expired() {
        let now = Utc::now();
        let expiry = ExpiresAt::from_datetime(now);
        assert!(expiry.is_expired_at(now));
        assert!(!expiry.is_expired_at(now - Duration::milliseconds(1)));
    }

    #[test]
    fn test_empty_token_is_never_logged_in() {
        let future = ExpiresAt::from_datetime(Utc::now() + Duration::hours(1));
        let state = SessionState::Authenticated(Session::new("", "admin", future));
        assert!(!state.is_logged_in());
        assert_eq!(state.authorization_header(), None);
        assert!(!Session::new("", "admin", future).is_valid_at(Utc::now()));
    }

    #[test]
    fn test_snapshot_of_anonymous() {
        let snapshot = SessionSnapshot::from(&SessionState::Anonymous);
        assert!(!snapshot.is_logged_in);
        assert_eq!(snapshot.username, "");
    }
}
