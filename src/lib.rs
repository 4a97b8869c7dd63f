//! TopicHub console core
//!
//! Client-side session lifecycle and route authorization for the TopicHub
//! admin console. [`Console`] ties the session store, the router and a shared
//! HTTP client together so that:
//!
//! - the session survives restarts through durable storage,
//! - every request built with [`Console::get`] and friends carries the
//!   current bearer token,
//! - every navigation is checked against the session first.

pub mod config;
pub mod error;
pub mod fetch;

use log::debug;
use reqwest::Client;
use std::sync::Arc;
use topichub_auth::{FileStorage, MemoryStorage, SessionAuthorizer, SessionStorage};

pub use topichub_auth as auth;
pub use topichub_router as router;

use crate::auth::{LoginRequest, LoginResponse, SessionSnapshot, SessionStore};
use crate::config::{ConsoleConfig, ConsoleOptions};
use crate::error::Result;
use crate::fetch::{Fetch, FetchBuilder};
use crate::router::{Navigation, NavigationGuard, ResolvedRoute, RouteTable, Router};

/// The main entry point for the console core
pub struct Console {
    config: ConsoleConfig,
    options: ConsoleOptions,
    http_client: Client,
    session: SessionStore,
    authorizer: SessionAuthorizer,
    router: Router,
}

impl Console {
    /// Create a console client with default options and the console's route table.
    ///
    /// # Example
    ///
    /// ```
    /// use topichub_console::{Console, config::ConsoleConfig};
    ///
    /// let config = ConsoleConfig::new("http://localhost:8080/api").unwrap();
    /// let console = Console::new(config).unwrap();
    /// assert!(!console.is_logged_in());
    /// ```
    pub fn new(config: ConsoleConfig) -> Result<Self> {
        Self::new_with_options(config, ConsoleOptions::default(), RouteTable::default())
    }

    /// Create a console client with custom options and routes.
    ///
    /// Durable storage is the configured session file, or memory when none is set.
    pub fn new_with_options(
        config: ConsoleConfig,
        options: ConsoleOptions,
        routes: RouteTable,
    ) -> Result<Self> {
        let storage: Arc<dyn SessionStorage> = match &config.session_file {
            Some(path) => Arc::new(FileStorage::new(path)),
            None => Arc::new(MemoryStorage::new()),
        };
        Self::with_storage(config, options, routes, storage)
    }

    /// Create a console client over an explicit storage backend.
    pub fn with_storage(
        config: ConsoleConfig,
        options: ConsoleOptions,
        routes: RouteTable,
        storage: Arc<dyn SessionStorage>,
    ) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = options.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder.build()?;

        let session = SessionStore::new(config.api_base(), http_client.clone(), storage)?;
        let authorizer = session.authorizer();
        let router = Router::new(
            routes,
            NavigationGuard::new(&options.login_path, &options.home_path),
        );
        debug!("console client ready for {}", config.api_base());

        Ok(Self {
            config,
            options,
            http_client,
            session,
            authorizer,
            router,
        })
    }

    /// Convenience function to create a client directly from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(ConsoleConfig::from_env()?)
    }

    pub fn config(&self) -> &ConsoleConfig {
        &self.config
    }

    pub fn options(&self) -> &ConsoleOptions {
        &self.options
    }

    /// The session store
    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn is_logged_in(&self) -> bool {
        self.session.is_logged_in()
    }

    pub fn username(&self) -> String {
        self.session.username()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.session.snapshot()
    }

    /// Reconcile the session with durable storage, e.g. at startup
    pub fn initialize(&self) -> Result<()> {
        Ok(self.session.initialize()?)
    }

    pub async fn login(&self, request: LoginRequest) -> Result<LoginResponse> {
        Ok(self.session.login(request).await?)
    }

    pub async fn logout(&self) -> Result<()> {
        Ok(self.session.logout().await?)
    }

    /// Navigate to `to` through the guard
    pub fn navigate(&mut self, to: &str) -> Result<Navigation> {
        Ok(self.router.navigate(&self.session, to)?)
    }

    pub fn current_route(&self) -> Option<&ResolvedRoute> {
        self.router.current()
    }

    /// Absolute URL for an API path such as `/topics`
    pub fn api_url(&self, path: &str) -> String {
        format!("{}/{}", self.config.api_base(), path.trim_start_matches('/'))
    }

    /// Create an authenticated GET request
    ///
    /// # Example
    ///
    /// ```no_run
    /// # async fn run(console: topichub_console::Console) -> topichub_console::error::Result<()> {
    /// let systems: serde_json::Value = console.get("/systems").execute().await?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn get(&self, path: &str) -> FetchBuilder<'_> {
        Fetch::get(&self.http_client, &self.api_url(path)).intercept(&self.authorizer)
    }

    /// Create an authenticated POST request
    pub fn post(&self, path: &str) -> FetchBuilder<'_> {
        Fetch::post(&self.http_client, &self.api_url(path)).intercept(&self.authorizer)
    }

    /// Create an authenticated PUT request
    pub fn put(&self, path: &str) -> FetchBuilder<'_> {
        Fetch::put(&self.http_client, &self.api_url(path)).intercept(&self.authorizer)
    }

    /// Create an authenticated DELETE request
    pub fn delete(&self, path: &str) -> FetchBuilder<'_> {
        Fetch::delete(&self.http_client, &self.api_url(path)).intercept(&self.authorizer)
    }
}

/// A convenience module for common imports
pub mod prelude {
    pub use crate::auth::{LoginRequest, LoginResponse, SessionSnapshot};
    pub use crate::config::{ConsoleConfig, ConsoleOptions};
    pub use crate::error::Error;
    pub use crate::router::{GuardDecision, Navigation};
    pub use crate::Console;
}
