//! Configuration for the console core

use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::error::{Error, Result};

/// Where the backend lives and where the session is kept.
#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    /// API base, e.g. `http://localhost:8080/api`
    pub url: Url,

    /// Session file; `None` keeps the session in memory only
    pub session_file: Option<PathBuf>,
}

impl ConsoleConfig {
    /// Creates a new configuration, validating the URL.
    pub fn new(url_str: &str) -> Result<Self> {
        let url = Url::parse(url_str)?;
        if url.cannot_be_a_base() {
            return Err(Error::config(format!("{} cannot be used as an API base", url_str)));
        }
        Ok(Self {
            url,
            session_file: None,
        })
    }

    pub fn with_session_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.session_file = Some(path.into());
        self
    }

    /// Reads `TOPICHUB_API_URL` and, if set, `TOPICHUB_SESSION_FILE`.
    pub fn from_env() -> Result<Self> {
        let url_str = std::env::var("TOPICHUB_API_URL")
            .map_err(|_| Error::config("TOPICHUB_API_URL environment variable not found"))?;
        let config = Self::new(&url_str)?;

        Ok(match std::env::var_os("TOPICHUB_SESSION_FILE") {
            Some(path) if !path.is_empty() => config.with_session_file(path),
            _ => config,
        })
    }

    /// The API base without a trailing slash
    pub fn api_base(&self) -> &str {
        self.url.as_str().trim_end_matches('/')
    }
}

/// Tunables for the console client
#[derive(Debug, Clone)]
pub struct ConsoleOptions {
    /// The request timeout
    pub request_timeout: Option<Duration>,

    /// Where the guard sends anonymous users
    pub login_path: String,

    /// Where the guard sends logged-in users who open the login page
    pub home_path: String,
}

impl Default for ConsoleOptions {
    fn default() -> Self {
        Self {
            request_timeout: Some(Duration::from_secs(30)),
            login_path: "/login".to_string(),
            home_path: "/dashboard".to_string(),
        }
    }
}

impl ConsoleOptions {
    /// Set the request timeout
    pub fn with_request_timeout(mut self, value: Option<Duration>) -> Self {
        self.request_timeout = value;
        self
    }

    /// Set the login page path
    pub fn with_login_path(mut self, value: &str) -> Self {
        self.login_path = value.to_string();
        self
    }

    /// Set the home page path
    pub fn with_home_path(mut self, value: &str) -> Self {
        self.home_path = value.to_string();
        self
    }
}
