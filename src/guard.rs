//! Pre-navigation authentication check.
//!
//! Decision table for a route marked `requires_auth`:
//!
//! | credential | profile | fetch   | previous route | decision           |
//! |------------|---------|---------|----------------|--------------------|
//! | none       | -       | -       | yes            | stay               |
//! | none       | -       | -       | no             | redirect home      |
//! | present    | loaded  | -       | -              | allow              |
//! | present    | missing | ok      | -              | allow              |
//! | present    | missing | fails   | yes            | stay, session gone |
//! | present    | missing | fails   | no             | home, session gone |
//!
//! Unprotected routes are always allowed. Every blocked navigation asks the
//! UI for a login prompt via [`Signal::LoginRequired`].

use std::sync::Arc;

use crate::session::SessionService;
use crate::signal::{Notice, Signal, SignalBus};

pub const HOME_PATH: &str = "/";
pub const LOGIN_FIRST_MESSAGE: &str = "Please log in first";
pub const SESSION_EXPIRED_MESSAGE: &str = "Login expired, please log in again";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteMeta {
    pub requires_auth: bool,
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// `None` for the synthetic initial route before any navigation.
    pub name: Option<String>,
    pub path: String,
    pub meta: RouteMeta,
}

impl Route {
    #[must_use]
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self { name: Some(name.into()), path: path.into(), meta: RouteMeta::default() }
    }

    #[must_use]
    pub fn protected(mut self) -> Self {
        self.meta.requires_auth = true;
        self
    }

    #[must_use]
    pub fn titled(mut self, title: impl Into<String>) -> Self {
        self.meta.title = Some(title.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    /// Cancel; the user stays where they were.
    Stay,
    Redirect { path: String, replace: bool },
}

pub struct NavigationGuard {
    session: Arc<SessionService>,
    signals: SignalBus,
}

impl NavigationGuard {
    #[must_use]
    pub fn new(session: Arc<SessionService>, signals: SignalBus) -> Self {
        Self { session, signals }
    }

    /// Decide whether navigation from `from` to `to` may proceed.
    pub async fn check(&self, to: &Route, from: Option<&Route>) -> Decision {
        if !to.meta.requires_auth {
            return Decision::Allow;
        }
        let has_previous = from.is_some_and(|r| r.name.is_some());

        if self.session.credential().is_none() {
            tracing::info!(path = %to.path, "protected route without credential");
            self.signals.notify(Notice::warning(LOGIN_FIRST_MESSAGE));
            self.signals.emit(Signal::LoginRequired);
            return blocked(has_previous);
        }

        if self.session.has_profile() {
            return Decision::Allow;
        }

        match self.session.fetch_profile().await {
            Ok(_) => Decision::Allow,
            Err(err) => {
                tracing::warn!(path = %to.path, error = %err, "profile fetch failed; ending session");
                self.session.logout().await;
                self.signals.notify(Notice::error(SESSION_EXPIRED_MESSAGE));
                self.signals.emit(Signal::SessionExpired);
                self.signals.emit(Signal::LoginRequired);
                blocked(has_previous)
            }
        }
    }
}

fn blocked(has_previous: bool) -> Decision {
    if has_previous {
        Decision::Stay
    } else {
        Decision::Redirect { path: HOME_PATH.to_owned(), replace: true }
    }
}

#[cfg(test)]
#[path = "guard_test.rs"]
mod tests;
