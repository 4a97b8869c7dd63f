//! Error handling for the console core

use std::fmt;
use thiserror::Error;

pub use topichub_auth::AuthError;
pub use topichub_router::RouterError;

/// Unified error type for the console
#[derive(Error, Debug)]
pub enum Error {
    /// Login, logout or session storage errors
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Navigation errors
    #[error("Routing error: {0}")]
    Router(#[from] RouterError),

    /// Network or HTTP related errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization or deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing errors
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// A request the backend answered with a failure
    #[error("Request failed with status {status}: {body}")]
    Api { status: u16, body: String },
}

impl Error {
    /// Create a new configuration error
    pub fn config<T: fmt::Display>(msg: T) -> Self {
        Error::Config(msg.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
