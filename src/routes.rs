//! Route table and a headless router that runs the navigation guard.
//!
//! SYSTEM CONTEXT
//! ==============
//! The router tracks the current route and document title the way a browser
//! history would, so the guard sees the same `from` it would in a page. Views
//! are out of scope: a route is a name, a path, and metadata.

use std::sync::{Mutex, PoisonError};

use crate::guard::{Decision, NavigationGuard, Route};

/// Cap on chained redirects before navigation gives up.
const MAX_HOPS: usize = 8;

#[derive(Debug, Clone)]
enum Entry {
    Page(Route),
    Redirect { path: String, target: String },
}

/// Ordered path table with a catch-all.
#[derive(Debug, Clone)]
pub struct RouteTable {
    entries: Vec<Entry>,
    not_found: Route,
}

impl RouteTable {
    #[must_use]
    pub fn new(not_found: Route) -> Self {
        Self { entries: Vec::new(), not_found }
    }

    #[must_use]
    pub fn page(mut self, route: Route) -> Self {
        self.entries.push(Entry::Page(route));
        self
    }

    #[must_use]
    pub fn redirect(mut self, path: impl Into<String>, target: impl Into<String>) -> Self {
        self.entries.push(Entry::Redirect { path: path.into(), target: target.into() });
        self
    }

    /// The application's routes.
    #[must_use]
    pub fn app_default() -> Self {
        Self::new(Route::new("NotFound", "/:pathMatch(.*)*").titled("Page Not Found"))
            .page(Route::new("home", "/"))
            .redirect("/home", "/")
            .page(Route::new("AIChat", "/ai-chat"))
            .page(Route::new("ComfortSimulator", "/comfort-simulator"))
            .page(Route::new("CustomerService", "/customer-service"))
            .page(Route::new("ChatPDF", "/chat-pdf"))
            .page(Route::new("game", "/game"))
            .page(Route::new("about", "/about"))
            .page(Route::new("thinking-chat", "/thinking-chat"))
            .page(Route::new("Profile", "/profile").protected().titled("Profile"))
            .page(Route::new("ProfileEdit", "/profile/edit").protected().titled("Edit Profile"))
    }

    /// Resolve a location to a route, following static redirects. Unknown
    /// paths resolve to the catch-all with the requested path.
    #[must_use]
    pub fn resolve(&self, location: &str) -> Route {
        let mut path = normalize_path(location);
        for _ in 0..MAX_HOPS {
            match self.lookup(&path) {
                Some(Entry::Page(route)) => return route.clone(),
                Some(Entry::Redirect { target, .. }) => path = normalize_path(target),
                None => break,
            }
        }
        Route { path, ..self.not_found.clone() }
    }

    /// Paths match without regard to ASCII case, like a browser router.
    fn lookup(&self, path: &str) -> Option<&Entry> {
        self.entries.iter().find(|entry| match entry {
            Entry::Page(route) => route.path.eq_ignore_ascii_case(path),
            Entry::Redirect { path: from, .. } => from.eq_ignore_ascii_case(path),
        })
    }
}

/// Drop query and fragment; trim a trailing slash except on the root.
fn normalize_path(location: &str) -> String {
    let path = location.split(['?', '#']).next().unwrap_or_default();
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_owned()
    } else if trimmed.starts_with('/') {
        trimmed.to_owned()
    } else {
        format!("/{trimmed}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationOutcome {
    /// Landed on `route`; `redirected` when the guard sent us elsewhere first.
    Arrived { route: Route, redirected: bool },
    /// The guard cancelled; the current route is unchanged.
    Blocked,
}

pub struct Router {
    table: RouteTable,
    guard: NavigationGuard,
    app_title: String,
    current: Mutex<Option<Route>>,
    title: Mutex<Option<String>>,
}

impl Router {
    #[must_use]
    pub fn new(table: RouteTable, guard: NavigationGuard, app_title: impl Into<String>) -> Self {
        Self { table, guard, app_title: app_title.into(), current: Mutex::new(None), title: Mutex::new(None) }
    }

    #[must_use]
    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    #[must_use]
    pub fn current(&self) -> Option<Route> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Document title, `"{route title} - {app title}"` once a titled route
    /// has been visited.
    #[must_use]
    pub fn title(&self) -> Option<String> {
        self.title.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Navigate to `location`, running the guard on every hop.
    ///
    /// The title follows the target route even when the guard blocks it.
    pub async fn navigate(&self, location: &str) -> NavigationOutcome {
        let mut target = location.to_owned();
        let mut redirected = false;

        for _ in 0..MAX_HOPS {
            let to = self.table.resolve(&target);
            let from = self.current();
            if let Some(title) = &to.meta.title {
                *self.title.lock().unwrap_or_else(PoisonError::into_inner) = Some(format!("{title} - {}", self.app_title));
            }

            match self.guard.check(&to, from.as_ref()).await {
                Decision::Allow => {
                    tracing::debug!(path = %to.path, redirected, "navigation complete");
                    *self.current.lock().unwrap_or_else(PoisonError::into_inner) = Some(to.clone());
                    return NavigationOutcome::Arrived { route: to, redirected };
                }
                Decision::Stay => return NavigationOutcome::Blocked,
                Decision::Redirect { path, .. } => {
                    tracing::debug!(from = %to.path, to = %path, "guard redirected navigation");
                    target = path;
                    redirected = true;
                }
            }
        }

        tracing::warn!(location, "navigation exceeded redirect limit");
        NavigationOutcome::Blocked
    }
}

#[cfg(test)]
#[path = "routes_test.rs"]
mod tests;
