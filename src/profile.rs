//! Canonical user profile and the raw auth payload shapes it is built from.
//!
//! DESIGN
//! ======
//! The backend answers auth calls in three shapes:
//! - nested: `{ token, user: {…profile} }`
//! - flat: `{ token, …profile }` (password and ID-token login)
//! - interleaved: `{ token, …profile }` from an OAuth callback, where the
//!   token is not profile data and is stripped
//!
//! [`AuthPayload`] names the shape explicitly. Normalization itself is a pure
//! function over a JSON object. Unrecognized fields pass through untouched:
//! the profile is an open record so views can read fields this layer does
//! not know about. Non-object payloads are rejected.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("unrecognized profile payload: expected an object, got {0}")]
    UnrecognizedShape(&'static str),
    #[error("auth payload carries no token")]
    MissingToken,
}

/// Normalized user profile.
///
/// Always carries `username` when the backend sent `username`, `userName`,
/// or `nickName`. Carries `isAdmin` when it was sent or derivable from
/// `role` / `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserProfile(Map<String, Value>);

impl UserProfile {
    #[must_use]
    pub fn id(&self) -> Option<&Value> {
        self.0.get("id")
    }

    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.0.get("username").and_then(Value::as_str)
    }

    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.0.get("email").and_then(Value::as_str)
    }

    /// `true` only when `isAdmin` is literally `true`.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.0.get("isAdmin").and_then(Value::as_bool).unwrap_or(false)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    #[must_use]
    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

/// Normalize a raw profile. `null` normalizes to `None`.
///
/// Steps, in order:
/// 1. no `username`: copy it from `userName`, else from `nickName`;
/// 2. `isAdmin` present: keep it as-is and stop;
/// 3. `role` present: `isAdmin = (role == 0)` and stop;
/// 4. `id == 1`: `isAdmin = true`.
///
/// Idempotent: normalizing a normalized profile changes nothing.
///
/// # Errors
///
/// Returns [`ProfileError::UnrecognizedShape`] for anything but an object or `null`.
pub fn normalize(raw: Value) -> Result<Option<UserProfile>, ProfileError> {
    match raw {
        Value::Null => Ok(None),
        Value::Object(fields) => Ok(Some(normalize_fields(fields))),
        other => Err(ProfileError::UnrecognizedShape(json_type(&other))),
    }
}

fn normalize_fields(mut fields: Map<String, Value>) -> UserProfile {
    if !fields.contains_key("username") {
        let alias = fields.get("userName").or_else(|| fields.get("nickName")).cloned();
        if let Some(username) = alias {
            fields.insert("username".to_owned(), username);
        }
    }

    if fields.contains_key("isAdmin") {
        return UserProfile(fields);
    }

    if let Some(role) = fields.get("role") {
        let admin = is_number(role, 0.0);
        fields.insert("isAdmin".to_owned(), Value::Bool(admin));
    } else if fields.get("id").is_some_and(|id| is_number(id, 1.0)) {
        fields.insert("isAdmin".to_owned(), Value::Bool(true));
    }

    UserProfile(fields)
}

/// Strict numeric equality: `"0"` is not `0`.
fn is_number(value: &Value, expected: f64) -> bool {
    value.as_f64().is_some_and(|n| (n - expected).abs() < f64::EPSILON)
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

// =============================================================================
// AUTH PAYLOAD SHAPES
// =============================================================================

/// `data` of a successful login-style response, classified by shape.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthPayload {
    Nested { token: String, user: Value },
    Flat { token: String, fields: Map<String, Value> },
    Interleaved { token: String, fields: Map<String, Value> },
}

impl AuthPayload {
    /// Classify the payload of a password, registration, or ID-token login.
    /// A truthy `user` field means nested; otherwise the payload is the profile.
    ///
    /// # Errors
    ///
    /// Returns a [`ProfileError`] if `data` is not an object or has no string token.
    pub fn from_login(data: Value) -> Result<Self, ProfileError> {
        let (token, mut fields) = split_token(data)?;
        match fields.remove("user") {
            Some(user) if is_truthy(&user) => Ok(Self::Nested { token, user }),
            Some(user) => {
                fields.insert("user".to_owned(), user);
                Ok(Self::Flat { token, fields })
            }
            None => Ok(Self::Flat { token, fields }),
        }
    }

    /// Classify the payload of an OAuth callback exchange.
    ///
    /// # Errors
    ///
    /// Returns a [`ProfileError`] if `data` is not an object or has no string token.
    pub fn from_oauth_callback(data: Value) -> Result<Self, ProfileError> {
        let (token, fields) = split_token(data)?;
        Ok(Self::Interleaved { token, fields })
    }

    #[must_use]
    pub fn token(&self) -> &str {
        match self {
            Self::Nested { token, .. } | Self::Flat { token, .. } | Self::Interleaved { token, .. } => token,
        }
    }

    /// Split into the credential and the normalized profile.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::UnrecognizedShape`] if the profile part is not an object.
    pub fn into_session_parts(self) -> Result<(String, UserProfile), ProfileError> {
        let (token, raw) = match self {
            Self::Nested { token, user } => (token, user),
            Self::Flat { token, mut fields } => {
                fields.insert("token".to_owned(), Value::String(token.clone()));
                (token, Value::Object(fields))
            }
            Self::Interleaved { token, fields } => (token, Value::Object(fields)),
        };
        let profile = normalize(raw)?.ok_or(ProfileError::UnrecognizedShape("null"))?;
        Ok((token, profile))
    }
}

/// Pull the token out of an object payload, leaving the remaining fields.
fn split_token(data: Value) -> Result<(String, Map<String, Value>), ProfileError> {
    let Value::Object(mut fields) = data else {
        return Err(ProfileError::UnrecognizedShape(json_type(&data)));
    };
    match fields.remove("token") {
        Some(Value::String(token)) => Ok((token, fields)),
        _ => Err(ProfileError::MissingToken),
    }
}

#[cfg(test)]
#[path = "profile_test.rs"]
mod tests;
