//! Third-party sign-in.
//!
//! ARCHITECTURE
//! ============
//! Two flows end in a backend session:
//! - ID token (Google Identity Services): load the provider script once,
//!   prompt the user, wait up to a deadline for the credential callback, then
//!   exchange the ID token. See [`id_token`].
//! - Redirect (Google, GitHub): fetch the provider's authorization URL from
//!   the backend, let the user leave, then exchange the `code` the provider
//!   appends to the callback URL. See [`redirect`].
//!
//! The browser pieces (script injection, the `google.accounts.id` object)
//! sit behind [`script::ScriptLoader`] and [`id_token::IdentitySdk`] so the
//! flow logic runs and tests natively. With the `hydrate` feature, `gsi`
//! implements both over the DOM.

#[cfg(feature = "hydrate")]
pub mod gsi;
pub mod id_token;
pub mod redirect;
pub mod script;

use std::time::Duration;

use crate::http::ApiError;
use crate::session::SessionError;

pub use crate::gateway::OAuthProvider;
pub use id_token::{
    CredentialCallback, CredentialResponse, GoogleIdentity, ID_TOKEN_DEADLINE, IdentityClient, IdentitySdk,
    InitOptions, PromptMode, PromptMoment,
};
pub use redirect::{RedirectFlow, callback_code, parse_authorization_url};
pub use script::{GOOGLE_IDENTITY_SCRIPT, ScriptLoader, ScriptRegistry};

#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
    #[error("Google client id is not configured (set GOOGLE_CLIENT_ID)")]
    MissingClientId,
    #[error("failed to load script {src}: {reason}")]
    ScriptLoad { src: String, reason: String },
    #[error("identity SDK did not load correctly")]
    SdkUnavailable,
    #[error("no credential received from the identity provider")]
    NoCredential,
    #[error("timed out after {}s waiting for an ID token", .0.as_secs())]
    Timeout(Duration),
    #[error("provider denied authorization: {0}")]
    ProviderDenied(String),
    #[error("callback URL carries no authorization code")]
    MissingCode,
    #[error("invalid authorization URL: {0}")]
    InvalidAuthorizationUrl(String),
    #[error("{0}")]
    Rejected(String),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Session(#[from] SessionError),
}
