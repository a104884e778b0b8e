//! Authorization-code redirect flow.
//!
//! The backend owns the provider app registration: it hands out the
//! authorization URL and later exchanges the `code` the provider appends to
//! the callback URL. This side only fetches, parses, and forwards.

use std::sync::Arc;

use serde_json::Value;
use url::Url;

use super::OAuthError;
use crate::gateway::{AuthOutcome, OAuthProvider};
use crate::profile::UserProfile;
use crate::session::SessionService;

pub struct RedirectFlow {
    session: Arc<SessionService>,
}

impl RedirectFlow {
    #[must_use]
    pub fn new(session: Arc<SessionService>) -> Self {
        Self { session }
    }

    /// Where to send the user to start signing in with `provider`.
    ///
    /// # Errors
    ///
    /// Transport failures, a rejected envelope, or a URL that does not parse.
    pub async fn authorization_url(&self, provider: OAuthProvider) -> Result<Url, OAuthError> {
        match self.session.gateway().authorization_url(provider).await? {
            AuthOutcome::Success(data) => parse_authorization_url(&data),
            AuthOutcome::Failure(msg) => Err(OAuthError::Rejected(
                msg.unwrap_or_else(|| format!("{} sign-in is unavailable", provider.display_name())),
            )),
        }
    }

    /// Finish sign-in from the URL the provider redirected back to.
    ///
    /// # Errors
    ///
    /// [`OAuthError::ProviderDenied`] / [`OAuthError::MissingCode`] for a bad
    /// callback, or [`OAuthError::Session`] when the exchange fails.
    pub async fn complete(&self, provider: OAuthProvider, callback_url: &Url) -> Result<UserProfile, OAuthError> {
        let code = callback_code(callback_url)?;
        tracing::info!(%provider, "exchanging authorization code");
        Ok(self.session.login_with_oauth_code(provider, &code).await?)
    }
}

/// Accept either a bare URL string or `{ "url": "…" }`.
///
/// # Errors
///
/// [`OAuthError::InvalidAuthorizationUrl`] for anything else or a non-http(s) URL.
pub fn parse_authorization_url(data: &Value) -> Result<Url, OAuthError> {
    let raw = match data {
        Value::String(s) => s.as_str(),
        Value::Object(map) => map.get("url").and_then(Value::as_str).unwrap_or_default(),
        _ => "",
    };
    if raw.trim().is_empty() {
        return Err(OAuthError::InvalidAuthorizationUrl("response carries no URL".to_owned()));
    }
    let url = Url::parse(raw.trim()).map_err(|e| OAuthError::InvalidAuthorizationUrl(format!("{raw}: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(OAuthError::InvalidAuthorizationUrl(format!("unsupported scheme `{other}`"))),
    }
}

/// Extract the authorization code from a provider callback URL.
///
/// # Errors
///
/// [`OAuthError::ProviderDenied`] when the provider sent `error`, otherwise
/// [`OAuthError::MissingCode`] when `code` is absent or empty.
pub fn callback_code(url: &Url) -> Result<String, OAuthError> {
    let mut code = None;
    let mut error = None;
    let mut description = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            "error_description" => description = Some(value.into_owned()),
            _ => {}
        }
    }

    if let Some(error) = error {
        let reason = match description {
            Some(description) if !description.is_empty() => format!("{error}: {description}"),
            _ => error,
        };
        return Err(OAuthError::ProviderDenied(reason));
    }
    code.filter(|c| !c.is_empty()).ok_or(OAuthError::MissingCode)
}

#[cfg(test)]
#[path = "redirect_test.rs"]
mod tests;
