//! Backend auth routes.
//!
//! SYSTEM CONTEXT
//! ==============
//! Thin mapping from domain operations to pipeline calls. No state lives
//! here; interpreting an [`AuthOutcome`] is the session service's job.
//!
//! Backend envelope: `{ code, data, msg? }` where `code == 200` is success.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::http::{ApiError, HttpPipeline, PipelineRequest};

pub const LOGIN_PATH: &str = "/user/user/login";
pub const REGISTER_PATH: &str = "/user/user/register";
pub const USER_INFO_PATH: &str = "/user/user/userinfo";
pub const GOOGLE_ID_TOKEN_LOGIN_PATH: &str = "/user/user/google/idtoken-login";
pub const LOGOUT_PATH: &str = "/user/user/logout";

const SUCCESS_CODE: f64 = 200.0;

/// Third-party identity providers with a redirect (authorization-code) flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OAuthProvider {
    Google,
    GitHub,
}

impl OAuthProvider {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::GitHub => "github",
        }
    }

    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Google => "Google",
            Self::GitHub => "GitHub",
        }
    }

    #[must_use]
    pub fn authorization_url_path(self) -> String {
        format!("/user/user/{}/url", self.as_str())
    }

    #[must_use]
    pub fn callback_path(self) -> String {
        format!("/user/user/{}/callback", self.as_str())
    }
}

impl fmt::Display for OAuthProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OAuthProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "google" => Ok(Self::Google),
            "github" => Ok(Self::GitHub),
            other => Err(format!("unknown provider `{other}` (expected google or github)")),
        }
    }
}

#[derive(Clone, Serialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterForm {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    pub email: String,
    pub password: String,
}

/// Interpreted backend envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthOutcome {
    /// `code == 200`; carries `data` (`null` when absent).
    Success(Value),
    /// Any other code; carries `msg` when the backend sent one.
    Failure(Option<String>),
}

impl AuthOutcome {
    /// Interpret a response payload as an envelope. Payloads that are not
    /// envelopes at all count as failures.
    #[must_use]
    pub fn from_payload(mut payload: Value) -> Self {
        let ok = payload
            .get("code")
            .and_then(Value::as_f64)
            .is_some_and(|code| (code - SUCCESS_CODE).abs() < f64::EPSILON);
        if ok {
            let data = payload.get_mut("data").map(Value::take).unwrap_or(Value::Null);
            return Self::Success(data);
        }
        let msg = payload
            .get("msg")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_owned);
        Self::Failure(msg)
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// Auth endpoints over the shared pipeline. Cheap to clone.
#[derive(Clone)]
pub struct AuthGateway {
    http: Arc<HttpPipeline>,
}

impl AuthGateway {
    #[must_use]
    pub fn new(http: Arc<HttpPipeline>) -> Self {
        Self { http }
    }

    #[must_use]
    pub fn http(&self) -> &HttpPipeline {
        &self.http
    }

    async fn call(&self, request: PipelineRequest) -> Result<AuthOutcome, ApiError> {
        let payload = self.http.send(request).await?;
        Ok(AuthOutcome::from_payload(payload))
    }

    /// `POST /user/user/login`
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] on transport or HTTP status failure.
    pub async fn login(&self, form: &LoginForm) -> Result<AuthOutcome, ApiError> {
        self.call(PipelineRequest::post(LOGIN_PATH).json(serde_json::to_value(form)?)).await
    }

    /// `POST /user/user/register`
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] on transport or HTTP status failure.
    pub async fn register(&self, form: &RegisterForm) -> Result<AuthOutcome, ApiError> {
        self.call(PipelineRequest::post(REGISTER_PATH).json(serde_json::to_value(form)?)).await
    }

    /// `GET /user/user/userinfo`
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] on transport or HTTP status failure.
    pub async fn user_info(&self) -> Result<AuthOutcome, ApiError> {
        self.call(PipelineRequest::get(USER_INFO_PATH)).await
    }

    /// `POST /user/user/google/idtoken-login` with `{ idToken }`.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] on transport or HTTP status failure.
    pub async fn google_id_token_login(&self, id_token: &str) -> Result<AuthOutcome, ApiError> {
        let body = serde_json::json!({ "idToken": id_token });
        self.call(PipelineRequest::post(GOOGLE_ID_TOKEN_LOGIN_PATH).json(body)).await
    }

    /// `GET /user/user/{provider}/url`
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] on transport or HTTP status failure.
    pub async fn authorization_url(&self, provider: OAuthProvider) -> Result<AuthOutcome, ApiError> {
        self.call(PipelineRequest::get(provider.authorization_url_path())).await
    }

    /// `GET /user/user/{provider}/callback?code=…`
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] on transport or HTTP status failure.
    pub async fn oauth_callback(&self, provider: OAuthProvider, code: &str) -> Result<AuthOutcome, ApiError> {
        self.call(PipelineRequest::get(provider.callback_path()).query("code", code)).await
    }

    /// `POST /user/user/logout`
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] on transport or HTTP status failure.
    pub async fn logout(&self) -> Result<AuthOutcome, ApiError> {
        self.call(PipelineRequest::post(LOGOUT_PATH)).await
    }
}

#[cfg(test)]
#[path = "gateway_test.rs"]
mod tests;
