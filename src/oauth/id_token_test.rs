use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::json;

use super::*;
use crate::gateway::GOOGLE_ID_TOKEN_LOGIN_PATH;
use crate::oauth::script::ScriptLoader;
use crate::test_support::{Harness, envelope_ok};

struct InstantLoader;

#[async_trait::async_trait]
impl ScriptLoader for InstantLoader {
    async fn load(&self, _src: &str) -> Result<(), OAuthError> {
        Ok(())
    }
}

enum Behavior {
    Deliver(Option<String>),
    Silent,
}

struct FakeClient {
    behavior: Behavior,
    moments: Vec<PromptMoment>,
    init: Mutex<Option<InitOptions>>,
    callback: Mutex<Option<CredentialCallback>>,
    prompts: AtomicUsize,
    saw_listener: Mutex<Option<bool>>,
}

impl FakeClient {
    fn new(behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            moments: vec![PromptMoment::NotDisplayed],
            init: Mutex::new(None),
            callback: Mutex::new(None),
            prompts: AtomicUsize::new(0),
            saw_listener: Mutex::new(None),
        })
    }

    fn stored_callback(&self) -> CredentialCallback {
        self.callback.lock().unwrap().clone().expect("initialized")
    }
}

impl IdentityClient for FakeClient {
    fn initialize(&self, options: InitOptions, callback: CredentialCallback) {
        *self.init.lock().unwrap() = Some(options);
        *self.callback.lock().unwrap() = Some(callback);
    }

    fn prompt(&self, listener: Option<MomentListener>) {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        *self.saw_listener.lock().unwrap() = Some(listener.is_some());
        if let Some(listener) = listener {
            for moment in &self.moments {
                listener(*moment);
            }
        }
        if let Behavior::Deliver(token) = &self.behavior {
            self.stored_callback().deliver(CredentialResponse { credential: token.clone() });
        }
    }
}

struct FakeSdk(Option<Arc<FakeClient>>);

impl IdentitySdk for FakeSdk {
    fn identity_client(&self) -> Option<Arc<dyn IdentityClient>> {
        self.0.clone().map(|client| client as Arc<dyn IdentityClient>)
    }
}

fn identity(client: Option<Arc<FakeClient>>, client_id: Option<&str>) -> GoogleIdentity {
    let scripts = Arc::new(ScriptRegistry::new(Arc::new(InstantLoader)));
    GoogleIdentity::new(client_id.map(str::to_owned), scripts, Arc::new(FakeSdk(client)))
}

#[test]
fn callback_resolves_only_once() {
    let pending = PendingIdToken::new(ID_TOKEN_DEADLINE);
    let callback = pending.callback();
    assert!(callback.deliver(CredentialResponse { credential: Some("first".into()) }));
    assert!(!callback.deliver(CredentialResponse { credential: Some("second".into()) }));
}

#[tokio::test]
async fn first_delivery_wins() {
    let pending = PendingIdToken::new(ID_TOKEN_DEADLINE);
    let callback = pending.callback();
    callback.deliver(CredentialResponse { credential: Some("first".into()) });
    callback.deliver(CredentialResponse { credential: Some("second".into()) });
    assert_eq!(pending.wait().await.unwrap(), "first");
}

#[tokio::test]
async fn empty_credential_is_an_error() {
    let pending = PendingIdToken::new(ID_TOKEN_DEADLINE);
    pending.callback().deliver(CredentialResponse { credential: Some(String::new()) });
    assert!(matches!(pending.wait().await, Err(OAuthError::NoCredential)));
}

#[tokio::test]
async fn explicit_prompt_returns_token() {
    let client = FakeClient::new(Behavior::Deliver(Some("id-token".into())));
    let google = identity(Some(client.clone()), Some("client-123"));

    let token = google.acquire_id_token(PromptMode::Explicit).await.unwrap();
    assert_eq!(token, "id-token");

    let init = client.init.lock().unwrap().clone().unwrap();
    assert_eq!(init.client_id, "client-123");
    assert!(!init.auto_select);
    assert!(!init.cancel_on_tap_outside);
    assert_eq!(*client.saw_listener.lock().unwrap(), Some(false));
}

#[tokio::test]
async fn one_tap_registers_moment_listener() {
    let client = FakeClient::new(Behavior::Deliver(Some("tap".into())));
    let google = identity(Some(client.clone()), Some("client-123"));

    assert_eq!(google.acquire_id_token(PromptMode::OneTap).await.unwrap(), "tap");
    assert_eq!(*client.saw_listener.lock().unwrap(), Some(true));
    assert_eq!(client.prompts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn missing_client_id_fails_before_loading() {
    let client = FakeClient::new(Behavior::Silent);
    let google = identity(Some(client.clone()), Some("   "));
    assert!(matches!(google.acquire_id_token(PromptMode::Explicit).await, Err(OAuthError::MissingClientId)));
    assert_eq!(client.prompts.load(Ordering::SeqCst), 0);

    let google = identity(Some(client), None);
    assert!(matches!(google.acquire_id_token(PromptMode::Explicit).await, Err(OAuthError::MissingClientId)));
}

#[tokio::test]
async fn unavailable_sdk_is_reported() {
    let google = identity(None, Some("client-123"));
    assert!(matches!(google.acquire_id_token(PromptMode::Explicit).await, Err(OAuthError::SdkUnavailable)));
}

#[tokio::test(start_paused = true)]
async fn silent_sdk_times_out_and_ignores_late_delivery() {
    let client = FakeClient::new(Behavior::Silent);
    let google = identity(Some(client.clone()), Some("client-123"));

    let err = google.acquire_id_token(PromptMode::OneTap).await.unwrap_err();
    assert!(matches!(err, OAuthError::Timeout(d) if d == ID_TOKEN_DEADLINE));
    assert!(!client.stored_callback().deliver(CredentialResponse { credential: Some("late".into()) }));
}

#[tokio::test]
async fn custom_deadline_is_honored() {
    let client = FakeClient::new(Behavior::Silent);
    let google = identity(Some(client), Some("client-123")).with_deadline(Duration::from_millis(50));
    assert!(matches!(google.acquire_id_token(PromptMode::Explicit).await, Err(OAuthError::Timeout(_))));
}

#[tokio::test]
async fn sign_in_exchanges_id_token_for_session() {
    let h = Harness::start().await;
    h.backend.respond("POST", GOOGLE_ID_TOKEN_LOGIN_PATH, 200, envelope_ok(json!({ "token": "s", "userName": "g" })));
    let client = FakeClient::new(Behavior::Deliver(Some("id-token".into())));
    let google = identity(Some(client), Some("client-123"));

    let profile = google.sign_in(&h.session, PromptMode::Explicit).await.unwrap();
    assert_eq!(profile.username(), Some("g"));
    assert_eq!(h.session.credential().as_deref(), Some("s"));
    assert_eq!(h.backend.last_hit("POST", GOOGLE_ID_TOKEN_LOGIN_PATH).json(), json!({ "idToken": "id-token" }));
}

#[test]
fn prompt_mode_follows_config() {
    let config = ClientConfig::new("http://localhost:8080/api").unwrap();
    assert_eq!(PromptMode::from_config(&config), PromptMode::Explicit);
    let config = ClientConfig { google_one_tap: true, ..config };
    assert_eq!(PromptMode::from_config(&config), PromptMode::OneTap);
}

#[tokio::test]
async fn from_config_uses_configured_client_id() {
    let client = FakeClient::new(Behavior::Deliver(Some("t".into())));
    let config = ClientConfig::new("http://localhost:8080/api").unwrap().with_google_client_id("cfg-id");
    let scripts = Arc::new(ScriptRegistry::new(Arc::new(InstantLoader)));
    let google = GoogleIdentity::from_config(&config, scripts, Arc::new(FakeSdk(Some(client.clone()))));

    google.acquire_id_token(PromptMode::from_config(&config)).await.unwrap();
    assert_eq!(client.init.lock().unwrap().as_ref().unwrap().client_id, "cfg-id");
}
