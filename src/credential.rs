//! Persistent bearer-credential storage.
//!
//! SYSTEM CONTEXT
//! ==============
//! The credential lives in a cookie-like store under one fixed key with a
//! seven-day expiry. It is read by the HTTP pipeline on every request and by
//! the navigation guard to test presence. Presence says nothing about
//! validity; the backend decides that when a request is rejected.
//!
//! TRADE-OFFS
//! ==========
//! Writers are not serialized against each other. A login finishing after a
//! logout was requested simply overwrites it (last write wins).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Lifetime of a freshly written credential.
pub const CREDENTIAL_TTL: time::Duration = time::Duration::days(7);

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("cookie file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("cookie file is not valid JSON: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("cookie store unavailable: {0}")]
    Unavailable(String),
}

/// One stored cookie value with its absolute expiry (unix seconds).
///
/// `expires_at` is `None` when the backing store enforces expiry itself and
/// does not report it (browser cookies).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCookie {
    pub value: String,
    pub expires_at: Option<i64>,
}

impl StoredCookie {
    #[must_use]
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        self.expires_at.is_some_and(|at| now.unix_timestamp() >= at)
    }
}

// =============================================================================
// COOKIE STRING ENCODING
// =============================================================================

/// Percent-encode a value for a `name=value` cookie pair, so `;`, `,` and
/// spaces cannot cut it short.
#[must_use]
pub fn encode_cookie_value(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// Inverse of [`encode_cookie_value`]. Values that are not valid percent
/// encoding (written by another client) are returned as-is.
#[must_use]
pub fn decode_cookie_value(raw: &str) -> String {
    urlencoding::decode(raw).map_or_else(|_| raw.to_owned(), std::borrow::Cow::into_owned)
}

/// Find `name` in a `document.cookie`-style header and decode its value.
#[must_use]
pub fn find_cookie(header: &str, name: &str) -> Option<String> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| decode_cookie_value(value))
}

/// Raw key/value cookie storage. Implementations do no validation.
pub trait CookieBackend: Send + Sync {
    /// Read a cookie by name.
    ///
    /// # Errors
    ///
    /// Returns a [`CredentialError`] if the underlying store cannot be read.
    fn read(&self, name: &str) -> Result<Option<StoredCookie>, CredentialError>;

    /// Write (or overwrite) a cookie.
    ///
    /// # Errors
    ///
    /// Returns a [`CredentialError`] if the underlying store cannot be written.
    fn write(&self, name: &str, cookie: StoredCookie) -> Result<(), CredentialError>;

    /// Delete a cookie. Deleting a missing cookie is not an error.
    ///
    /// # Errors
    ///
    /// Returns a [`CredentialError`] if the underlying store cannot be written.
    fn delete(&self, name: &str) -> Result<(), CredentialError>;
}

// =============================================================================
// CREDENTIAL STORE
// =============================================================================

/// The single bearer credential, persisted under a fixed cookie key.
///
/// Cheap to clone; clones share the same backend.
#[derive(Clone)]
pub struct CredentialStore {
    backend: Arc<dyn CookieBackend>,
    key: String,
}

impl CredentialStore {
    #[must_use]
    pub fn new(backend: Arc<dyn CookieBackend>, key: impl Into<String>) -> Self {
        Self { backend, key: key.into() }
    }

    /// Store backed by process memory only.
    #[must_use]
    pub fn in_memory(key: impl Into<String>) -> Self {
        Self::new(Arc::new(MemoryCookies::default()), key)
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Current credential, if one is stored and not expired.
    #[must_use]
    pub fn get(&self) -> Option<String> {
        self.get_at(OffsetDateTime::now_utc())
    }

    /// Persist `token` with a [`CREDENTIAL_TTL`] expiry.
    ///
    /// # Errors
    ///
    /// Returns a [`CredentialError`] if the backend rejects the write.
    pub fn set(&self, token: &str) -> Result<(), CredentialError> {
        self.set_at(token, OffsetDateTime::now_utc())
    }

    /// Clear the stored credential.
    ///
    /// # Errors
    ///
    /// Returns a [`CredentialError`] if the backend rejects the delete.
    pub fn remove(&self) -> Result<(), CredentialError> {
        self.backend.delete(&self.key)
    }

    /// Internal: read with explicit timestamp (for testing).
    pub(crate) fn get_at(&self, now: OffsetDateTime) -> Option<String> {
        match self.backend.read(&self.key) {
            Ok(Some(cookie)) if cookie.is_expired_at(now) => {
                if let Err(e) = self.backend.delete(&self.key) {
                    tracing::warn!(error = %e, "failed to purge expired credential");
                }
                None
            }
            Ok(Some(cookie)) => Some(cookie.value),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, key = %self.key, "credential read failed");
                None
            }
        }
    }

    /// Internal: write with explicit timestamp (for testing).
    pub(crate) fn set_at(&self, token: &str, now: OffsetDateTime) -> Result<(), CredentialError> {
        let expires_at = (now + CREDENTIAL_TTL).unix_timestamp();
        self.backend.write(&self.key, StoredCookie { value: token.to_owned(), expires_at: Some(expires_at) })
    }
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore").field("key", &self.key).finish_non_exhaustive()
    }
}

// =============================================================================
// BACKENDS
// =============================================================================

/// In-process cookie map. Lost when the process exits.
#[derive(Default)]
pub struct MemoryCookies {
    cookies: Mutex<HashMap<String, StoredCookie>>,
}

impl CookieBackend for MemoryCookies {
    fn read(&self, name: &str) -> Result<Option<StoredCookie>, CredentialError> {
        let cookies = self.cookies.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(cookies.get(name).cloned())
    }

    fn write(&self, name: &str, cookie: StoredCookie) -> Result<(), CredentialError> {
        let mut cookies = self.cookies.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        cookies.insert(name.to_owned(), cookie);
        Ok(())
    }

    fn delete(&self, name: &str) -> Result<(), CredentialError> {
        let mut cookies = self.cookies.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        cookies.remove(name);
        Ok(())
    }
}

/// Cookie map persisted as a JSON object in a single file.
///
/// Used by the command-line driver so a login survives between invocations.
pub struct FileCookies {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    guard: Mutex<()>,
}

impl FileCookies {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), guard: Mutex::new(()) }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<HashMap<String, StoredCookie>, CredentialError> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(HashMap::new()),
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, cookies: &HashMap<String, StoredCookie>) -> Result<(), CredentialError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(cookies)?;
        std::fs::write(&self.path, raw)?;
        Ok(())
    }
}

impl CookieBackend for FileCookies {
    fn read(&self, name: &str) -> Result<Option<StoredCookie>, CredentialError> {
        let _guard = self.guard.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(self.load()?.remove(name))
    }

    fn write(&self, name: &str, cookie: StoredCookie) -> Result<(), CredentialError> {
        let _guard = self.guard.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut cookies = self.load()?;
        cookies.insert(name.to_owned(), cookie);
        self.save(&cookies)
    }

    fn delete(&self, name: &str) -> Result<(), CredentialError> {
        let _guard = self.guard.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut cookies = self.load()?;
        if cookies.remove(name).is_some() {
            self.save(&cookies)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "credential_test.rs"]
mod tests;
