//! # authgate
//!
//! Client-side session and authentication layer for the blog frontend.
//!
//! Keeps the bearer credential in a cookie store, attaches it to every
//! backend call, normalizes user profiles, guards protected routes, and
//! bridges third-party sign-in (Google ID token, Google/GitHub redirect).
//! UI collaborators learn about login prompts and failures through the
//! [`signal::SignalBus`].

#[cfg(feature = "hydrate")]
pub mod browser;
pub mod config;
pub mod credential;
pub mod gateway;
pub mod guard;
pub mod http;
pub mod oauth;
pub mod profile;
pub mod routes;
pub mod session;
pub mod signal;
pub mod state;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::{ClientConfig, ConfigError};
pub use credential::{CredentialError, CredentialStore};
pub use gateway::{AuthGateway, AuthOutcome, LoginForm, OAuthProvider, RegisterForm};
pub use guard::{Decision, NavigationGuard, Route, RouteMeta};
pub use http::{ApiError, ErrorKind, HttpPipeline};
pub use oauth::OAuthError;
pub use profile::{AuthPayload, ProfileError, UserProfile};
pub use routes::{NavigationOutcome, RouteTable, Router};
pub use session::{SessionError, SessionService, SessionState};
pub use signal::{Notice, NoticeLevel, Signal, SignalBus};
pub use state::AppState;
