//! The navigation guard

use log::debug;
use serde::Serialize;
use topichub_auth::{AuthError, SessionStore};

use crate::route::{normalize_path, ResolvedRoute};

/// What the guard does with one navigation attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum GuardDecision {
    Allow,
    RedirectToLogin,
    RedirectToHome,
}

/// Session as seen by the guard.
pub trait SessionGate {
    /// Bring the session up to date and report whether it is logged in.
    fn reconcile(&self) -> Result<bool, AuthError>;
}

impl SessionGate for SessionStore {
    fn reconcile(&self) -> Result<bool, AuthError> {
        self.initialize()?;
        Ok(self.is_logged_in())
    }
}

/// The authorization decision table.
///
/// | requires auth | logged in | login page | outcome |
/// |---|---|---|---|
/// | yes | no | - | redirect to login |
/// | yes | yes | - | allow |
/// | no | yes | yes | redirect to home |
/// | no | - | no | allow |
pub fn decide(requires_auth: bool, is_logged_in: bool, is_login_page: bool) -> GuardDecision {
    match (requires_auth, is_logged_in, is_login_page) {
        (true, false, _) => GuardDecision::RedirectToLogin,
        (true, true, _) => GuardDecision::Allow,
        (false, true, true) => GuardDecision::RedirectToHome,
        (false, _, _) => GuardDecision::Allow,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationGuard {
    login_path: String,
    home_path: String,
}

impl Default for NavigationGuard {
    fn default() -> Self {
        Self::new("/login", "/dashboard")
    }
}

impl NavigationGuard {
    pub fn new(login_path: &str, home_path: &str) -> Self {
        Self {
            login_path: normalize_path(login_path),
            home_path: normalize_path(home_path),
        }
    }

    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    pub fn home_path(&self) -> &str {
        &self.home_path
    }

    /// Decide one transition. The session is reconciled first, so expiry
    /// since the last navigation is noticed here.
    pub fn check<G>(
        &self,
        session: &G,
        from: Option<&ResolvedRoute>,
        to: &ResolvedRoute,
    ) -> Result<GuardDecision, AuthError>
    where
        G: SessionGate + ?Sized,
    {
        let is_logged_in = session.reconcile()?;
        let decision = decide(to.requires_auth(), is_logged_in, to.path == self.login_path);

        debug!(
            "guard {} -> {}: {:?} (logged in: {})",
            from.map_or("<start>", |route| route.path.as_str()),
            to.path,
            decision,
            is_logged_in
        );
        Ok(decision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::RouteTable;
    use std::cell::Cell;

    struct FixedSession {
        logged_in: bool,
        reconciled: Cell<usize>,
    }

    impl FixedSession {
        fn new(logged_in: bool) -> Self {
            Self {
                logged_in,
                reconciled: Cell::new(0),
            }
        }
    }

    impl SessionGate for FixedSession {
        fn reconcile(&self) -> Result<bool, AuthError> {
            self.reconciled.set(self.reconciled.get() + 1);
            Ok(self.logged_in)
        }
    }

    #[test]
    fn test_decision_table() {
        use GuardDecision::*;

        assert_eq!(decide(true, false, false), RedirectToLogin);
        assert_eq!(decide(true, false, true), RedirectToLogin);
        assert_eq!(decide(true, true, false), Allow);
        assert_eq!(decide(true, true, true), Allow);
        assert_eq!(decide(false, true, true), RedirectToHome);
        assert_eq!(decide(false, false, true), Allow);
        assert_eq!(decide(false, true, false), Allow);
        assert_eq!(decide(false, false, false), Allow);
    }

    #[test]
    fn test_check_reconciles_every_time() {
        let table = RouteTable::default();
        let guard = NavigationGuard::default();
        let session = FixedSession::new(false);
        let topics = table.resolve("/topics").unwrap();

        assert_eq!(
            guard.check(&session, None, &topics).unwrap(),
            GuardDecision::RedirectToLogin
        );
        assert_eq!(
            guard.check(&session, None, &topics).unwrap(),
            GuardDecision::RedirectToLogin
        );
        assert_eq!(session.reconciled.get(), 2);
    }

    #[test]
    fn test_logged_in_user_is_sent_home_from_login() {
        let table = RouteTable::default();
        let guard = NavigationGuard::default();
        let session = FixedSession::new(true);
        let login = table.resolve("/login?redirect=/topics").unwrap();

        assert_eq!(
            guard.check(&session, None, &login).unwrap(),
            GuardDecision::RedirectToHome
        );
    }

    #[test]
    fn test_custom_login_path() {
        let table = RouteTable::new(&[crate::RouteRecord::new("/signin").public()]);
        let guard = NavigationGuard::new("/signin/", "/home");
        let signin = table.resolve("/signin").unwrap();

        assert_eq!(guard.login_path(), "/signin");
        assert_eq!(
            guard.check(&FixedSession::new(true), None, &signin).unwrap(),
            GuardDecision::RedirectToHome
        );
    }
}
