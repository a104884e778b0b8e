//! Google ID-token sign-in.
//!
//! DESIGN
//! ======
//! The identity SDK reports the credential through a callback registered at
//! initialization. [`CredentialCallback`] turns that callback into a
//! single-resolution handoff: the first delivery settles the wait, later
//! deliveries are ignored, and a delivery after the deadline finds the wait
//! abandoned and is ignored too.
//!
//! TRADE-OFFS
//! ==========
//! One-tap prompts that the SDK declines to show are only logged. The caller
//! still waits out the deadline, matching what a user sees in the browser.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::oneshot;

use super::OAuthError;
use super::script::{GOOGLE_IDENTITY_SCRIPT, ScriptRegistry};
use crate::config::ClientConfig;
use crate::profile::UserProfile;
use crate::session::SessionService;

/// How long to wait for the SDK to deliver a credential.
pub const ID_TOKEN_DEADLINE: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PromptMode {
    /// Let the SDK decide whether to show the one-tap prompt.
    OneTap,
    /// The user clicked a sign-in button.
    #[default]
    Explicit,
}

impl PromptMode {
    #[must_use]
    pub fn from_config(config: &ClientConfig) -> Self {
        if config.google_one_tap { Self::OneTap } else { Self::Explicit }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitOptions {
    pub client_id: String,
    pub auto_select: bool,
    pub cancel_on_tap_outside: bool,
}

/// Prompt lifecycle notifications from the SDK.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptMoment {
    Displayed,
    NotDisplayed,
    Skipped,
    Dismissed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialResponse {
    pub credential: Option<String>,
}

pub type MomentListener = Box<dyn Fn(PromptMoment) + Send + Sync>;

/// `google.accounts.id`.
pub trait IdentityClient: Send + Sync {
    fn initialize(&self, options: InitOptions, callback: CredentialCallback);
    fn prompt(&self, listener: Option<MomentListener>);
}

/// The loaded SDK namespace.
pub trait IdentitySdk: Send + Sync {
    /// `None` when the script loaded but did not expose the identity client.
    fn identity_client(&self) -> Option<Arc<dyn IdentityClient>>;
}

// =============================================================================
// SINGLE-RESOLUTION CALLBACK
// =============================================================================

type Delivery = Result<String, OAuthError>;

enum Pending {
    Waiting(oneshot::Sender<Delivery>),
    Settled,
    Abandoned,
}

/// Handle the SDK calls with the credential response.
#[derive(Clone)]
pub struct CredentialCallback {
    slot: Arc<Mutex<Pending>>,
}

impl CredentialCallback {
    /// Deliver a response. Returns `false` when the wait was already settled
    /// or abandoned and the response was ignored.
    pub fn deliver(&self, response: CredentialResponse) -> bool {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        match std::mem::replace(&mut *slot, Pending::Settled) {
            Pending::Waiting(tx) => {
                let delivery = response.credential.filter(|t| !t.is_empty()).ok_or(OAuthError::NoCredential);
                let _ = tx.send(delivery);
                true
            }
            other => {
                *slot = other;
                false
            }
        }
    }

    fn abandon(&self) {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if matches!(*slot, Pending::Waiting(_)) {
            *slot = Pending::Abandoned;
        }
    }
}

/// One outstanding wait for an ID token.
pub struct PendingIdToken {
    callback: CredentialCallback,
    rx: oneshot::Receiver<Delivery>,
    deadline: Duration,
}

impl PendingIdToken {
    #[must_use]
    pub fn new(deadline: Duration) -> Self {
        let (tx, rx) = oneshot::channel();
        let callback = CredentialCallback { slot: Arc::new(Mutex::new(Pending::Waiting(tx))) };
        Self { callback, rx, deadline }
    }

    #[must_use]
    pub fn callback(&self) -> CredentialCallback {
        self.callback.clone()
    }

    /// Wait for the first delivery or the deadline, whichever comes first.
    ///
    /// # Errors
    ///
    /// [`OAuthError::Timeout`] at the deadline, [`OAuthError::NoCredential`]
    /// for an empty response.
    pub async fn wait(self) -> Result<String, OAuthError> {
        let Self { callback, rx, deadline } = self;
        match tokio::time::timeout(deadline, rx).await {
            Ok(Ok(delivery)) => delivery,
            Ok(Err(_)) => Err(OAuthError::NoCredential),
            Err(_) => {
                callback.abandon();
                Err(OAuthError::Timeout(deadline))
            }
        }
    }
}

// =============================================================================
// GOOGLE IDENTITY FLOW
// =============================================================================

pub struct GoogleIdentity {
    client_id: Option<String>,
    script_src: String,
    scripts: Arc<ScriptRegistry>,
    sdk: Arc<dyn IdentitySdk>,
    deadline: Duration,
}

impl GoogleIdentity {
    #[must_use]
    pub fn new(client_id: Option<String>, scripts: Arc<ScriptRegistry>, sdk: Arc<dyn IdentitySdk>) -> Self {
        Self {
            client_id,
            script_src: GOOGLE_IDENTITY_SCRIPT.to_owned(),
            scripts,
            sdk,
            deadline: ID_TOKEN_DEADLINE,
        }
    }

    /// Client id from config; the SDK still has to be supplied by the host.
    #[must_use]
    pub fn from_config(config: &ClientConfig, scripts: Arc<ScriptRegistry>, sdk: Arc<dyn IdentitySdk>) -> Self {
        Self::new(config.google_client_id.clone(), scripts, sdk)
    }

    #[must_use]
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    #[must_use]
    pub fn with_script_src(mut self, src: impl Into<String>) -> Self {
        self.script_src = src.into();
        self
    }

    /// Obtain an ID token from the identity SDK.
    ///
    /// # Errors
    ///
    /// Fails fast without a client id or when the SDK is unavailable; otherwise
    /// see [`PendingIdToken::wait`].
    pub async fn acquire_id_token(&self, mode: PromptMode) -> Result<String, OAuthError> {
        let client_id = self
            .client_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or(OAuthError::MissingClientId)?;

        self.scripts.ensure_loaded(&self.script_src).await?;
        let client = self.sdk.identity_client().ok_or(OAuthError::SdkUnavailable)?;

        let pending = PendingIdToken::new(self.deadline);
        let options = InitOptions { client_id: client_id.to_owned(), auto_select: false, cancel_on_tap_outside: false };
        client.initialize(options, pending.callback());

        match mode {
            PromptMode::OneTap => {
                let listener: MomentListener = Box::new(|moment: PromptMoment| {
                    if matches!(moment, PromptMoment::NotDisplayed | PromptMoment::Skipped) {
                        tracing::info!(?moment, "one-tap prompt not shown");
                    }
                });
                client.prompt(Some(listener));
            }
            PromptMode::Explicit => client.prompt(None),
        }

        let result = pending.wait().await;
        match &result {
            Ok(_) => tracing::info!(?mode, "google id token acquired"),
            Err(err) => tracing::warn!(?mode, error = %err, "google id token not acquired"),
        }
        result
    }

    /// Acquire an ID token and exchange it for a backend session.
    ///
    /// # Errors
    ///
    /// Any [`OAuthError`] from acquisition, or [`OAuthError::Session`] from
    /// the exchange.
    pub async fn sign_in(&self, session: &SessionService, mode: PromptMode) -> Result<UserProfile, OAuthError> {
        let id_token = self.acquire_id_token(mode).await?;
        Ok(session.login_with_google_id_token(&id_token).await?)
    }
}

#[cfg(test)]
#[path = "id_token_test.rs"]
mod tests;
