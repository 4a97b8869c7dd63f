//! Route table and navigation guard for the TopicHub admin console
//!
//! Every navigation is resolved against the route table and then put through
//! the [`NavigationGuard`], which reconciles the session and decides whether
//! to allow it, send the user to the login page, or send them home.

mod guard;
mod route;

use log::{debug, info};
use serde::Serialize;
use thiserror::Error;
use topichub_auth::AuthError;

pub use guard::{decide, GuardDecision, NavigationGuard, SessionGate};
pub use route::{
    default_routes, normalize_path, MatchedRecord, ResolvedRoute, RouteMeta, RouteRecord,
    RouteTable,
};

/// Upper bound on redirects followed for a single navigation
pub const MAX_REDIRECTS: usize = 8;

#[derive(Error, Debug)]
pub enum RouterError {
    #[error("No route matches {0}")]
    NoMatch(String),

    #[error("Too many redirects while navigating to {0}")]
    RedirectLoop(String),

    #[error("Session error: {0}")]
    Session(#[from] AuthError),
}

/// Result of a completed navigation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Navigation {
    /// What the caller asked for, normalized
    pub requested: String,
    /// The guard's verdict on the requested location
    pub decision: GuardDecision,
    /// Where navigation actually landed
    pub resolved: ResolvedRoute,
}

impl Navigation {
    pub fn path(&self) -> &str {
        &self.resolved.path
    }

    pub fn redirected(&self) -> bool {
        self.resolved.path != self.requested
    }
}

/// Drives navigations through the route table and the guard.
///
/// Holds the current location. The session is passed in per call so the
/// router never owns or mutates it.
#[derive(Debug, Clone, Default)]
pub struct Router {
    table: RouteTable,
    guard: NavigationGuard,
    current: Option<ResolvedRoute>,
}

impl Router {
    pub fn new(table: RouteTable, guard: NavigationGuard) -> Self {
        Self {
            table,
            guard,
            current: None,
        }
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    pub fn guard(&self) -> &NavigationGuard {
        &self.guard
    }

    pub fn current(&self) -> Option<&ResolvedRoute> {
        self.current.as_ref()
    }

    /// Navigate to `to`.
    ///
    /// Guard redirects are themselves guarded, so the final location is always
    /// one the guard allows. `current` changes only on success.
    pub fn navigate<G>(&mut self, session: &G, to: &str) -> Result<Navigation, RouterError>
    where
        G: SessionGate + ?Sized,
    {
        let requested = normalize_path(to);
        let mut target = self.resolve(&requested)?;
        let mut first_decision = None;

        for _ in 0..MAX_REDIRECTS {
            let decision = self.guard.check(session, self.current.as_ref(), &target)?;
            let first = *first_decision.get_or_insert(decision);

            let next = match decision {
                GuardDecision::Allow => {
                    info!("navigated to {}", target.path);
                    self.current = Some(target.clone());
                    return Ok(Navigation {
                        requested,
                        decision: first,
                        resolved: target,
                    });
                }
                GuardDecision::RedirectToLogin => self.guard.login_path().to_string(),
                GuardDecision::RedirectToHome => self.guard.home_path().to_string(),
            };

            debug!("guard redirected {} to {}", target.path, next);
            target = self.resolve(&next)?;
        }

        Err(RouterError::RedirectLoop(requested))
    }

    /// Resolve `location`, following static redirects in the route table.
    pub fn resolve(&self, location: &str) -> Result<ResolvedRoute, RouterError> {
        let mut path = normalize_path(location);

        for _ in 0..MAX_REDIRECTS {
            let route = self
                .table
                .resolve(&path)
                .ok_or_else(|| RouterError::NoMatch(path.clone()))?;

            match route.redirect() {
                Some(redirect) => path = normalize_path(redirect),
                None => return Ok(route),
            }
        }

        Err(RouterError::RedirectLoop(normalize_path(location)))
    }
}
