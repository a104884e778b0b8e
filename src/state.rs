//! Composition root.
//!
//! DESIGN
//! ======
//! `AppState` wires one of everything: the signal bus, the HTTP pipeline, the
//! session, the router, and the redirect flow. All fields are `Arc`-wrapped or
//! cheap to clone, so the whole state clones freely into tasks and handlers.
//!
//! Google ID-token sign-in needs a host that can run the identity SDK. Browser
//! builds (`hydrate`) wire the DOM bindings when a client id is configured;
//! other hosts attach one with [`AppState::with_google_identity`].

use std::sync::Arc;

use crate::config::ClientConfig;
use crate::credential::CredentialStore;
use crate::gateway::AuthGateway;
use crate::guard::NavigationGuard;
use crate::http::{ApiError, HttpPipeline};
use crate::oauth::{GoogleIdentity, OAuthError, PromptMode, RedirectFlow};
use crate::profile::UserProfile;
use crate::routes::{RouteTable, Router};
use crate::session::SessionService;
use crate::signal::SignalBus;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ClientConfig>,
    pub signals: SignalBus,
    pub http: Arc<HttpPipeline>,
    pub session: Arc<SessionService>,
    pub router: Arc<Router>,
    pub redirect: Arc<RedirectFlow>,
    pub google: Option<Arc<GoogleIdentity>>,
}

impl AppState {
    /// Build the full stack over the given credential store.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::ClientBuild`] if the HTTP client cannot be built.
    pub fn new(config: ClientConfig, credentials: CredentialStore) -> Result<Self, ApiError> {
        let signals = SignalBus::new();
        let http = Arc::new(HttpPipeline::new(&config, credentials.clone(), signals.clone())?);
        let session = Arc::new(SessionService::new(AuthGateway::new(http.clone()), credentials));
        let guard = NavigationGuard::new(session.clone(), signals.clone());
        let router = Arc::new(Router::new(RouteTable::app_default(), guard, config.app_title.clone()));
        let redirect = Arc::new(RedirectFlow::new(session.clone()));

        let google = browser_google_identity(&config);

        tracing::debug!(api_base = %config.api_base_url, google = google.is_some(), "client state initialized");
        Ok(Self { config: Arc::new(config), signals, http, session, router, redirect, google })
    }

    #[must_use]
    pub fn with_google_identity(mut self, google: GoogleIdentity) -> Self {
        self.google = Some(Arc::new(google));
        self
    }

    /// Sign in through the Google identity SDK, prompting one-tap when
    /// `GOOGLE_ONE_TAP` is set.
    ///
    /// # Errors
    ///
    /// [`OAuthError::MissingClientId`] without a client id,
    /// [`OAuthError::SdkUnavailable`] when no identity host is attached, and
    /// otherwise whatever [`GoogleIdentity::sign_in`] reports.
    pub async fn google_sign_in(&self) -> Result<UserProfile, OAuthError> {
        let Some(google) = &self.google else {
            return Err(if self.config.google_client_id.is_some() {
                OAuthError::SdkUnavailable
            } else {
                OAuthError::MissingClientId
            });
        };
        google.sign_in(&self.session, PromptMode::from_config(&self.config)).await
    }
}

#[cfg(feature = "hydrate")]
fn browser_google_identity(config: &ClientConfig) -> Option<Arc<GoogleIdentity>> {
    use crate::oauth::ScriptRegistry;
    use crate::oauth::gsi::{DocumentScripts, GsiSdk};

    config.google_client_id.as_ref()?;
    let scripts = Arc::new(ScriptRegistry::new(Arc::new(DocumentScripts)));
    Some(Arc::new(GoogleIdentity::from_config(config, scripts, Arc::new(GsiSdk))))
}

#[cfg(not(feature = "hydrate"))]
fn browser_google_identity(_config: &ClientConfig) -> Option<Arc<GoogleIdentity>> {
    None
}

#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
