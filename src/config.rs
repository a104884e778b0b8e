//! Client configuration parsed from environment variables.
//!
//! DESIGN
//! ======
//! Every value has a default so an unconfigured client still starts. The only
//! hard failure is an API base that cannot be resolved to an absolute URL,
//! since nothing downstream can recover from that.

use std::time::Duration;

use url::Url;

pub const PRODUCTION_API_BASE: &str = "/api";
pub const DEVELOPMENT_API_BASE: &str = "https://blog.hazenix.top/api";
pub const DEFAULT_APP_ORIGIN: &str = "http://localhost:5173";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CREDENTIAL_COOKIE_KEY: &str = "blog_token";
pub const DEFAULT_APP_TITLE: &str = "Haze AI Hub";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid API base URL `{value}`: {reason}")]
    InvalidBaseUrl { value: String, reason: String },
    #[error("invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },
}

/// Which default API base applies when no override is configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildMode {
    Production,
    Development,
}

impl BuildMode {
    /// Mode implied by the compilation profile.
    #[must_use]
    pub fn from_profile() -> Self {
        if cfg!(debug_assertions) { Self::Development } else { Self::Production }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Absolute API base without a trailing slash.
    pub api_base_url: String,
    pub request_timeout: Duration,
    pub google_client_id: Option<String>,
    /// Use the passive one-tap prompt instead of the explicit account chooser.
    pub google_one_tap: bool,
    pub credential_cookie_key: String,
    pub app_title: String,
}

impl ClientConfig {
    /// Config pointing at an explicit API base, everything else defaulted.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBaseUrl`] if `api_base_url` does not
    /// resolve to an http(s) URL. Relative values join [`DEFAULT_APP_ORIGIN`].
    pub fn new(api_base_url: &str) -> Result<Self, ConfigError> {
        let api_base_url = resolve_api_base(Some(api_base_url), BuildMode::Development, DEFAULT_APP_ORIGIN)?;
        Ok(Self {
            api_base_url,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            google_client_id: None,
            google_one_tap: false,
            credential_cookie_key: DEFAULT_CREDENTIAL_COOKIE_KEY.to_owned(),
            app_title: DEFAULT_APP_TITLE.to_owned(),
        })
    }

    /// Build config from process environment variables.
    ///
    /// - `BLOG_API_BASE_URL`: API base override (empty means the app origin)
    /// - `APP_ENV`: `production` or `development`; defaults from the build profile
    /// - `APP_ORIGIN`: origin that relative bases resolve against
    /// - `REQUEST_TIMEOUT_SECS`: default 30
    /// - `GOOGLE_CLIENT_ID`: identity SDK client id
    /// - `GOOGLE_ONE_TAP`: boolean, default false
    /// - `CREDENTIAL_COOKIE_KEY`: default `blog_token`
    /// - `APP_TITLE`: default `Haze AI Hub`
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if a value is present but malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ClientConfig::from_env`] with an injectable variable source.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if a value is present but malformed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mode = match lookup("APP_ENV") {
            Some(raw) => parse_build_mode(&raw)?,
            None => BuildMode::from_profile(),
        };
        let origin = lookup("APP_ORIGIN").unwrap_or_else(|| DEFAULT_APP_ORIGIN.to_owned());
        let api_base_url = resolve_api_base(lookup("BLOG_API_BASE_URL").as_deref(), mode, &origin)?;

        let request_timeout = match lookup("REQUEST_TIMEOUT_SECS") {
            Some(raw) => {
                let secs = raw
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| ConfigError::InvalidValue { var: "REQUEST_TIMEOUT_SECS", value: raw.clone() })?;
                Duration::from_secs(secs)
            }
            None => Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        };

        let google_client_id = lookup("GOOGLE_CLIENT_ID")
            .map(|id| id.trim().to_owned())
            .filter(|id| !id.is_empty());
        let google_one_tap = match lookup("GOOGLE_ONE_TAP") {
            Some(raw) => parse_bool(&raw).ok_or(ConfigError::InvalidValue { var: "GOOGLE_ONE_TAP", value: raw })?,
            None => false,
        };

        Ok(Self {
            api_base_url,
            request_timeout,
            google_client_id,
            google_one_tap,
            credential_cookie_key: lookup("CREDENTIAL_COOKIE_KEY")
                .unwrap_or_else(|| DEFAULT_CREDENTIAL_COOKIE_KEY.to_owned()),
            app_title: lookup("APP_TITLE").unwrap_or_else(|| DEFAULT_APP_TITLE.to_owned()),
        })
    }

    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_google_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.google_client_id = Some(client_id.into());
        self
    }

    #[must_use]
    pub fn with_credential_cookie_key(mut self, key: impl Into<String>) -> Self {
        self.credential_cookie_key = key.into();
        self
    }

    #[must_use]
    pub fn with_app_title(mut self, title: impl Into<String>) -> Self {
        self.app_title = title.into();
        self
    }
}

/// Resolve the API base: explicit override, else the mode default. Relative
/// results are joined onto `origin`. Trailing slashes are always stripped.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidBaseUrl`] if the result is not a valid URL.
pub fn resolve_api_base(override_value: Option<&str>, mode: BuildMode, origin: &str) -> Result<String, ConfigError> {
    let raw = match override_value {
        Some(value) => value.trim().trim_end_matches('/').to_owned(),
        None => match mode {
            BuildMode::Production => PRODUCTION_API_BASE.to_owned(),
            BuildMode::Development => DEVELOPMENT_API_BASE.to_owned(),
        },
    };

    let absolute = if raw.contains("://") {
        raw
    } else {
        let origin = origin.trim().trim_end_matches('/');
        if raw.is_empty() {
            origin.to_owned()
        } else if raw.starts_with('/') {
            format!("{origin}{raw}")
        } else {
            format!("{origin}/{raw}")
        }
    };

    match Url::parse(&absolute) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(absolute),
        Ok(url) => Err(ConfigError::InvalidBaseUrl {
            reason: format!("unsupported scheme `{}`", url.scheme()),
            value: absolute,
        }),
        Err(e) => Err(ConfigError::InvalidBaseUrl { value: absolute, reason: e.to_string() }),
    }
}

fn parse_build_mode(raw: &str) -> Result<BuildMode, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "production" | "prod" => Ok(BuildMode::Production),
        "development" | "dev" => Ok(BuildMode::Development),
        _ => Err(ConfigError::InvalidValue { var: "APP_ENV", value: raw.to_owned() }),
    }
}

pub(crate) fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
