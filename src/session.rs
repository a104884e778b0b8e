//! Authenticated session state.
//!
//! SYSTEM CONTEXT
//! ==============
//! The composition root builds exactly one [`SessionService`] and shares it
//! behind an `Arc`. It owns the in-memory profile; the credential lives in the
//! [`CredentialStore`] so it survives restarts.
//!
//! DESIGN
//! ======
//! Every login flavor funnels through `establish`: persist the token first,
//! then publish the profile. A failed step leaves the previous session intact,
//! so a rejected login never produces a half-authenticated state.
//!
//! TRADE-OFFS
//! ==========
//! Operations are not serialized. Two overlapping logins both write the
//! credential and the profile; the last one to finish wins.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};

use serde_json::Value;

use crate::credential::{CredentialError, CredentialStore};
use crate::gateway::{AuthGateway, AuthOutcome, LoginForm, OAuthProvider, RegisterForm};
use crate::http::ApiError;
use crate::profile::{AuthPayload, ProfileError, UserProfile, normalize};

pub const LOGIN_FAILED: &str = "Login failed";
pub const REGISTRATION_FAILED: &str = "Registration failed";
pub const USER_INFO_FAILED: &str = "Failed to fetch user info";
pub const GOOGLE_LOGIN_FAILED: &str = "Google login failed";
pub const GITHUB_LOGIN_FAILED: &str = "GitHub login failed";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No usable session. Also covers a stored credential whose profile has
    /// not been fetched yet.
    Anonymous,
    /// At least one login or profile fetch is in flight.
    Authenticating,
    /// Credential stored and profile loaded.
    Authenticated,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The backend answered with a non-200 envelope.
    #[error("{0}")]
    Rejected(String),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Payload(#[from] ProfileError),
    #[error("failed to persist credential: {0}")]
    Credential(#[from] CredentialError),
}

impl SessionError {
    /// Text suitable for a toast or CLI error line.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Rejected(msg) => msg.clone(),
            Self::Api(err) => err.user_message(),
            Self::Payload(err) => err.to_string(),
            Self::Credential(err) => err.to_string(),
        }
    }
}

/// Counts in-flight operations for [`SessionState::Authenticating`].
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct SessionService {
    gateway: AuthGateway,
    credentials: CredentialStore,
    profile: RwLock<Option<UserProfile>>,
    in_flight: AtomicUsize,
}

impl SessionService {
    #[must_use]
    pub fn new(gateway: AuthGateway, credentials: CredentialStore) -> Self {
        Self { gateway, credentials, profile: RwLock::new(None), in_flight: AtomicUsize::new(0) }
    }

    #[must_use]
    pub fn gateway(&self) -> &AuthGateway {
        &self.gateway
    }

    /// Current credential, read through to the store.
    #[must_use]
    pub fn credential(&self) -> Option<String> {
        self.credentials.get()
    }

    #[must_use]
    pub fn profile(&self) -> Option<UserProfile> {
        self.profile.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    #[must_use]
    pub fn has_profile(&self) -> bool {
        self.profile.read().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        if self.in_flight.load(Ordering::SeqCst) > 0 {
            SessionState::Authenticating
        } else if self.has_profile() && self.credential().is_some() {
            SessionState::Authenticated
        } else {
            SessionState::Anonymous
        }
    }

    /// Email/password login.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Rejected`] with the backend message (or
    /// "Login failed") on a non-200 envelope; transport and payload errors
    /// propagate. The existing session is untouched on any error.
    pub async fn login(&self, form: &LoginForm) -> Result<UserProfile, SessionError> {
        let _op = InFlight::enter(&self.in_flight);
        let data = accept(self.gateway.login(form).await?, LOGIN_FAILED)?;
        self.establish(AuthPayload::from_login(data)?, "password")
    }

    /// Create an account; the backend logs the new user in directly.
    ///
    /// # Errors
    ///
    /// Same contract as [`SessionService::login`], with "Registration failed".
    pub async fn register(&self, form: &RegisterForm) -> Result<UserProfile, SessionError> {
        let _op = InFlight::enter(&self.in_flight);
        let data = accept(self.gateway.register(form).await?, REGISTRATION_FAILED)?;
        self.establish(AuthPayload::from_login(data)?, "register")
    }

    /// Exchange a Google ID token for a session.
    ///
    /// # Errors
    ///
    /// Same contract as [`SessionService::login`], with "Google login failed".
    pub async fn login_with_google_id_token(&self, id_token: &str) -> Result<UserProfile, SessionError> {
        let _op = InFlight::enter(&self.in_flight);
        let data = accept(self.gateway.google_id_token_login(id_token).await?, GOOGLE_LOGIN_FAILED)?;
        self.establish(AuthPayload::from_login(data)?, "google-id-token")
    }

    /// Exchange a GitHub authorization code for a session.
    ///
    /// # Errors
    ///
    /// Same contract as [`SessionService::login`], with "GitHub login failed".
    pub async fn login_with_github_code(&self, code: &str) -> Result<UserProfile, SessionError> {
        self.login_with_oauth_code(OAuthProvider::GitHub, code).await
    }

    /// Exchange an authorization code from any redirect provider.
    ///
    /// # Errors
    ///
    /// Same contract as [`SessionService::login`], with the provider's
    /// default failure message.
    pub async fn login_with_oauth_code(&self, provider: OAuthProvider, code: &str) -> Result<UserProfile, SessionError> {
        let _op = InFlight::enter(&self.in_flight);
        let fallback = match provider {
            OAuthProvider::Google => GOOGLE_LOGIN_FAILED,
            OAuthProvider::GitHub => GITHUB_LOGIN_FAILED,
        };
        let data = accept(self.gateway.oauth_callback(provider, code).await?, fallback)?;
        self.establish(AuthPayload::from_oauth_callback(data)?, provider.as_str())
    }

    /// Refresh the profile from the backend using the stored credential.
    /// A `null` payload clears the profile.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Rejected`] ("Failed to fetch user info" unless
    /// the backend says otherwise) on a non-200 envelope; transport and
    /// payload errors propagate. The cached profile is kept on error.
    pub async fn fetch_profile(&self) -> Result<Option<UserProfile>, SessionError> {
        let _op = InFlight::enter(&self.in_flight);
        let data = accept(self.gateway.user_info().await?, USER_INFO_FAILED)?;
        let profile = normalize(data)?;
        *self.profile.write().unwrap_or_else(PoisonError::into_inner) = profile.clone();
        tracing::debug!(loaded = profile.is_some(), "profile refreshed");
        Ok(profile)
    }

    /// End the session. The backend call is best effort; local state is
    /// always cleared.
    pub async fn logout(&self) {
        match self.gateway.logout().await {
            Ok(AuthOutcome::Success(_)) => {}
            Ok(AuthOutcome::Failure(msg)) => {
                tracing::debug!(msg = msg.as_deref().unwrap_or(""), "backend logout rejected; clearing locally");
            }
            Err(err) => tracing::debug!(error = %err, "backend logout failed; clearing locally"),
        }
        self.clear();
    }

    /// Drop local session state without contacting the backend.
    pub fn clear(&self) {
        *self.profile.write().unwrap_or_else(PoisonError::into_inner) = None;
        if let Err(err) = self.credentials.remove() {
            tracing::warn!(error = %err, "failed to remove stored credential");
        }
        tracing::info!("session cleared");
    }

    fn establish(&self, payload: AuthPayload, method: &'static str) -> Result<UserProfile, SessionError> {
        let (token, profile) = payload.into_session_parts()?;
        self.credentials.set(&token)?;
        *self.profile.write().unwrap_or_else(PoisonError::into_inner) = Some(profile.clone());
        tracing::info!(method, user_id = ?profile.id(), admin = profile.is_admin(), "session established");
        Ok(profile)
    }
}

fn accept(outcome: AuthOutcome, fallback: &str) -> Result<Value, SessionError> {
    match outcome {
        AuthOutcome::Success(data) => Ok(data),
        AuthOutcome::Failure(msg) => Err(SessionError::Rejected(msg.unwrap_or_else(|| fallback.to_owned()))),
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
