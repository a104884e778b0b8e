//! `document.cookie` backend for browser builds.
//!
//! Only compiled with the `hydrate` feature. The browser enforces cookie
//! expiry itself, so reads report `expires_at: None`.

use wasm_bindgen::JsCast;

use crate::credential::{CookieBackend, CredentialError, StoredCookie, encode_cookie_value, find_cookie};

/// Cookie backend over the current window's `document.cookie`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DocumentCookies;

fn html_document() -> Result<web_sys::HtmlDocument, CredentialError> {
    web_sys::window()
        .and_then(|w| w.document())
        .and_then(|d| d.dyn_into::<web_sys::HtmlDocument>().ok())
        .ok_or_else(|| CredentialError::Unavailable("no HTML document".to_owned()))
}

fn assign(cookie: &str) -> Result<(), CredentialError> {
    html_document()?
        .set_cookie(cookie)
        .map_err(|e| CredentialError::Unavailable(format!("{e:?}")))
}

impl CookieBackend for DocumentCookies {
    fn read(&self, name: &str) -> Result<Option<StoredCookie>, CredentialError> {
        let raw = html_document()?
            .cookie()
            .map_err(|e| CredentialError::Unavailable(format!("{e:?}")))?;
        Ok(find_cookie(&raw, name).map(|value| StoredCookie { value, expires_at: None }))
    }

    fn write(&self, name: &str, cookie: StoredCookie) -> Result<(), CredentialError> {
        let max_age = cookie
            .expires_at
            .map(|at| (at - time::OffsetDateTime::now_utc().unix_timestamp()).max(0));
        let value = encode_cookie_value(&cookie.value);
        match max_age {
            Some(secs) => assign(&format!("{name}={value}; path=/; max-age={secs}")),
            None => assign(&format!("{name}={value}; path=/")),
        }
    }

    fn delete(&self, name: &str) -> Result<(), CredentialError> {
        assign(&format!("{name}=; path=/; max-age=0"))
    }
}
