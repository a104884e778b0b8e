use serde_json::json;

use super::*;
use crate::gateway::USER_INFO_PATH;
use crate::signal::Signal;
use crate::test_support::{Harness, envelope_ok};

fn router(h: &Harness) -> Router {
    let guard = NavigationGuard::new(h.session.clone(), h.signals.clone());
    Router::new(RouteTable::app_default(), guard, "Haze AI Hub")
}

#[test]
fn resolve_matches_exact_paths_and_ignores_query() {
    let table = RouteTable::app_default();
    assert_eq!(table.resolve("/about").name.as_deref(), Some("about"));
    assert_eq!(table.resolve("/profile/edit?tab=1#top").name.as_deref(), Some("ProfileEdit"));
    assert_eq!(table.resolve("/profile/").name.as_deref(), Some("Profile"));
    assert_eq!(table.resolve("").path, "/");
}

#[test]
fn paths_match_regardless_of_case() {
    let table = RouteTable::app_default();
    let route = table.resolve("/PROFILE");
    assert_eq!(route.name.as_deref(), Some("Profile"));
    assert!(route.meta.requires_auth);
    assert_eq!(table.resolve("/Profile/Edit/").name.as_deref(), Some("ProfileEdit"));
    assert_eq!(table.resolve("/HOME").path, "/");
}

#[test]
fn home_alias_redirects_to_root() {
    let route = RouteTable::app_default().resolve("/home");
    assert_eq!(route.name.as_deref(), Some("home"));
    assert_eq!(route.path, "/");
}

#[test]
fn unknown_paths_hit_the_catch_all() {
    let route = RouteTable::app_default().resolve("/nope/deeper");
    assert_eq!(route.name.as_deref(), Some("NotFound"));
    assert_eq!(route.path, "/nope/deeper");
    assert_eq!(route.meta.title.as_deref(), Some("Page Not Found"));
    assert!(!route.meta.requires_auth);
}

#[test]
fn only_profile_pages_require_auth() {
    let table = RouteTable::app_default();
    for path in ["/", "/ai-chat", "/comfort-simulator", "/customer-service", "/chat-pdf", "/game", "/thinking-chat"] {
        assert!(!table.resolve(path).meta.requires_auth, "{path}");
    }
    assert!(table.resolve("/profile").meta.requires_auth);
    assert!(table.resolve("/profile/edit").meta.requires_auth);
}

#[test]
fn redirect_loops_fall_through_to_catch_all() {
    let table = RouteTable::new(Route::new("NotFound", "*")).redirect("/a", "/b").redirect("/b", "/a");
    assert_eq!(table.resolve("/a").name.as_deref(), Some("NotFound"));
}

#[tokio::test]
async fn open_route_arrives_and_tracks_current() {
    let h = Harness::start().await;
    let router = router(&h);
    let outcome = router.navigate("/about").await;
    assert!(matches!(outcome, NavigationOutcome::Arrived { ref route, redirected: false } if route.path == "/about"));
    assert_eq!(router.current().unwrap().name.as_deref(), Some("about"));
    assert_eq!(router.title(), None);
}

#[tokio::test]
async fn protected_route_on_first_load_lands_home() {
    let mut h = Harness::start().await;
    let router = router(&h);

    let outcome = router.navigate("/profile").await;
    assert!(matches!(outcome, NavigationOutcome::Arrived { ref route, redirected: true } if route.path == "/"));
    assert_eq!(router.title().as_deref(), Some("Profile - Haze AI Hub"));
    let prompts = h.signals_seen().iter().filter(|s| **s == Signal::LoginRequired).count();
    assert_eq!(prompts, 1);
}

#[tokio::test]
async fn mixed_case_protected_path_is_still_guarded() {
    let mut h = Harness::start().await;
    let router = router(&h);

    let outcome = router.navigate("/PROFILE").await;
    assert!(matches!(outcome, NavigationOutcome::Arrived { ref route, redirected: true } if route.path == "/"));
    let prompts = h.signals_seen().iter().filter(|s| **s == Signal::LoginRequired).count();
    assert_eq!(prompts, 1);
}

#[tokio::test]
async fn protected_route_after_a_page_is_blocked() {
    let h = Harness::start().await;
    let router = router(&h);
    router.navigate("/game").await;

    assert_eq!(router.navigate("/profile/edit").await, NavigationOutcome::Blocked);
    assert_eq!(router.current().unwrap().path, "/game");
    assert_eq!(router.title().as_deref(), Some("Edit Profile - Haze AI Hub"));
}

#[tokio::test]
async fn protected_route_with_valid_session_arrives() {
    let h = Harness::start().await;
    h.credentials.set("abc").unwrap();
    h.backend.respond("GET", USER_INFO_PATH, 200, envelope_ok(json!({ "id": 3, "userName": "u" })));
    let router = router(&h);

    let outcome = router.navigate("/profile").await;
    assert!(matches!(outcome, NavigationOutcome::Arrived { redirected: false, .. }));
    assert_eq!(router.current().unwrap().name.as_deref(), Some("Profile"));
}
