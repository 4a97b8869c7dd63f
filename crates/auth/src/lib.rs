//! Session store for the TopicHub admin console
//!
//! This crate owns "who is logged in and until when". It keeps the in-memory
//! session, durable storage and request authorization in step through
//! `initialize`, `login` and `logout`.

mod api;
mod interceptor;
mod session;
mod storage;
mod types;

use chrono::Utc;
use log::{debug, info, warn};
use reqwest::Client;
use std::sync::{Arc, RwLock};
use thiserror::Error;
use url::Url;

pub use api::{AuthApi, HttpAuthApi};
pub use interceptor::{RequestInterceptor, SessionAuthorizer};
pub use session::{ExpiresAt, Session, SessionSnapshot, SessionState};
pub use storage::{
    FileStorage, MemoryStorage, SessionStorage, EXPIRES_AT_KEY, SESSION_KEYS, TOKEN_KEY,
    USERNAME_KEY,
};
pub use types::{LoginRequest, LoginResponse};

use session::{read_state, write_state};

/// Errors raised by the session store
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Credentials rejected: {0}")]
    CredentialsRejected(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Invalid expiry: {0}")]
    InvalidExpiry(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("URL error: {0}")]
    UrlParse(#[from] url::ParseError),
}

/// Owner of the console session.
///
/// One instance per application. Everything else reads the session through it
/// (or through a `SessionAuthorizer` it hands out) and never mutates it directly.
pub struct SessionStore {
    api: Arc<dyn AuthApi>,
    storage: Arc<dyn SessionStorage>,
    state: Arc<RwLock<SessionState>>,
}

impl SessionStore {
    /// Create a store that talks to the backend rooted at `url` (e.g. `http://host/api`).
    pub fn new(
        url: &str,
        http_client: Client,
        storage: Arc<dyn SessionStorage>,
    ) -> Result<Self, AuthError> {
        Url::parse(url)?;
        Ok(Self::with_api(Arc::new(HttpAuthApi::new(url, http_client)), storage))
    }

    pub fn with_api(api: Arc<dyn AuthApi>, storage: Arc<dyn SessionStorage>) -> Self {
        Self {
            api,
            storage,
            state: Arc::new(RwLock::new(SessionState::Anonymous)),
        }
    }

    /// Reconcile the in-memory session with durable storage.
    ///
    /// A complete, unexpired stored session becomes the active one. Anything
    /// else (missing keys, unreadable expiry, expired token) is cleared locally
    /// without contacting the server. Safe to call before every navigation.
    pub fn initialize(&self) -> Result<(), AuthError> {
        match self.read_stored()? {
            Some(session) if session.is_valid_at(Utc::now()) => {
                let mut state = write_state(&self.state);
                if state.session() != Some(&session) {
                    debug!(
                        "restored session for {} (expires {})",
                        session.username, session.expires_at
                    );
                    *state = SessionState::Authenticated(session);
                }
                Ok(())
            }
            Some(session) => {
                info!(
                    "discarding stored session for {} (expires {})",
                    session.username, session.expires_at
                );
                self.clear_local()
            }
            None => self.clear_local(),
        }
    }

    /// Log in and make the returned identity the active session.
    ///
    /// Any failure, remote or local, leaves the current session and storage as
    /// they were.
    pub async fn login(&self, request: LoginRequest) -> Result<LoginResponse, AuthError> {
        debug!("logging in as {}", request.username);
        let response = self.api.login(&request).await?;

        let session = Session::new(
            response.token.clone(),
            response.username.clone(),
            response.expires_at,
        );
        self.commit(session)?;

        info!("logged in as {} until {}", response.username, response.expires_at);
        Ok(response)
    }

    /// Log out. The server is told on a best-effort basis; local state is
    /// always cleared.
    pub async fn logout(&self) -> Result<(), AuthError> {
        if let Some(token) = self.token() {
            if let Err(err) = self.api.logout(&token).await {
                warn!("logout notification failed, clearing local session anyway: {}", err);
            }
        }

        self.clear_local()?;
        info!("logged out");
        Ok(())
    }

    /// Adopt a session obtained out of band, with the same checks as a login.
    pub fn restore(&self, session: Session) -> Result<(), AuthError> {
        self.commit(session)
    }

    pub fn is_logged_in(&self) -> bool {
        read_state(&self.state).is_logged_in()
    }

    /// The principal's name, empty when anonymous
    pub fn username(&self) -> String {
        read_state(&self.state).username().to_string()
    }

    pub fn token(&self) -> Option<String> {
        read_state(&self.state)
            .session()
            .filter(|s| !s.token.is_empty())
            .map(|s| s.token.clone())
    }

    pub fn expires_at(&self) -> Option<ExpiresAt> {
        read_state(&self.state).session().map(|s| s.expires_at)
    }

    pub fn session(&self) -> Option<Session> {
        read_state(&self.state).session().cloned()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot::from(&*read_state(&self.state))
    }

    /// The header every outgoing request carries, if any
    pub fn authorization_header(&self) -> Option<String> {
        read_state(&self.state).authorization_header()
    }

    /// An interceptor bound to this store's live session
    pub fn authorizer(&self) -> SessionAuthorizer {
        SessionAuthorizer::new(Arc::clone(&self.state))
    }

    fn read_stored(&self) -> Result<Option<Session>, AuthError> {
        let token = self.storage.get(TOKEN_KEY)?;
        let username = self.storage.get(USERNAME_KEY)?;
        let expires_at = self.storage.get(EXPIRES_AT_KEY)?;

        let (Some(token), Some(username), Some(expires_at)) = (token, username, expires_at) else {
            return Ok(None);
        };

        match ExpiresAt::parse(&expires_at) {
            Ok(expires_at) => Ok(Some(Session::new(token, username, expires_at))),
            Err(err) => {
                warn!("discarding stored session: {}", err);
                Ok(None)
            }
        }
    }

    fn commit(&self, session: Session) -> Result<(), AuthError> {
        if session.token.is_empty() {
            return Err(AuthError::CredentialsRejected("server issued an empty token".to_string()));
        }
        if session.is_expired() {
            return Err(AuthError::InvalidExpiry(format!(
                "session already expired at {}",
                session.expires_at
            )));
        }

        if let Err(err) = self.persist(&session) {
            self.rollback_storage();
            return Err(err);
        }

        *write_state(&self.state) = SessionState::Authenticated(session);
        Ok(())
    }

    fn persist(&self, session: &Session) -> Result<(), AuthError> {
        self.storage.set(TOKEN_KEY, &session.token)?;
        self.storage.set(USERNAME_KEY, &session.username)?;
        self.storage
            .set(EXPIRES_AT_KEY, &session.expires_at.to_storage_string())?;
        Ok(())
    }

    // Put storage back to match the in-memory session after a failed write.
    // If the previous session cannot be written back either, the keys are
    // removed so storage never mixes two sessions.
    fn rollback_storage(&self) {
        let result = match self.session() {
            Some(previous) => self.persist(&previous).or_else(|err| {
                warn!("failed to restore stored session, clearing it: {}", err);
                self.remove_stored()
            }),
            None => self.remove_stored(),
        };
        if let Err(err) = result {
            warn!("failed to roll back session storage: {}", err);
        }
    }

    fn clear_local(&self) -> Result<(), AuthError> {
        {
            let mut state = write_state(&self.state);
            if state.is_logged_in() {
                debug!("clearing session for {}", state.username());
            }
            *state = SessionState::Anonymous;
        }
        self.remove_stored()
    }

    // Tries every key even when one fails, then reports the first failure.
    fn remove_stored(&self) -> Result<(), AuthError> {
        let mut first_error = None;
        for key in SESSION_KEYS {
            if let Err(err) = self.storage.remove(key) {
                warn!("failed to remove {} from session storage: {}", key, err);
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}
