//! Request authorization that reads the live session

use http::header::AUTHORIZATION;
use reqwest::RequestBuilder;
use std::sync::{Arc, RwLock};

use crate::session::{read_state, SessionState};

/// Hook applied to every outgoing API request before it is sent.
pub trait RequestInterceptor: Send + Sync {
    fn intercept(&self, request: RequestBuilder) -> RequestBuilder;
}

/// Adds `Authorization: Bearer <token>` while a session is active.
///
/// Shares state with the `SessionStore` it came from, so a login or logout is
/// visible to the next request without re-deriving anything.
#[derive(Debug, Clone)]
pub struct SessionAuthorizer {
    state: Arc<RwLock<SessionState>>,
}

impl SessionAuthorizer {
    pub(crate) fn new(state: Arc<RwLock<SessionState>>) -> Self {
        Self { state }
    }

    pub fn authorization_header(&self) -> Option<String> {
        read_state(&self.state).authorization_header()
    }
}

impl RequestInterceptor for SessionAuthorizer {
    fn intercept(&self, request: RequestBuilder) -> RequestBuilder {
        match self.authorization_header() {
            Some(value) => request.header(AUTHORIZATION, value),
            None => request,
        }
    }
}
