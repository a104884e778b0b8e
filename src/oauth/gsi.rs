//! Browser bindings for Google Identity Services.
//!
//! Only compiled with the `hydrate` feature. [`DocumentScripts`] injects
//! `<script>` tags; [`GsiSdk`] drives `window.google.accounts.id`.
//!
//! DESIGN
//! ======
//! JS handles are not `Send`, so nothing here stores one. Each call looks the
//! SDK object up on the global again, and the script loader settles through a
//! tokio oneshot that the `onload`/`onerror` handlers complete.

use std::sync::{Arc, Mutex, PoisonError};

use js_sys::{Function, Object, Reflect};
use tokio::sync::oneshot;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};

use super::OAuthError;
use super::id_token::{
    CredentialCallback, CredentialResponse, IdentityClient, IdentitySdk, InitOptions, MomentListener, PromptMoment,
};
use super::script::ScriptLoader;

fn load_error(src: &str, reason: impl Into<String>) -> OAuthError {
    OAuthError::ScriptLoad { src: src.to_owned(), reason: reason.into() }
}

// =============================================================================
// SCRIPT INJECTION
// =============================================================================

/// Appends `<script async src>` to `<head>` and waits for it to load.
#[derive(Debug, Default, Clone, Copy)]
pub struct DocumentScripts;

type Settle = Arc<Mutex<Option<oneshot::Sender<Result<(), String>>>>>;

fn settle_handler(slot: &Settle, outcome: Result<(), String>) -> JsValue {
    let slot = slot.clone();
    Closure::once_into_js(move || {
        if let Some(tx) = slot.lock().unwrap_or_else(PoisonError::into_inner).take() {
            let _ = tx.send(outcome);
        }
    })
}

/// Inject the tag. Returns `None` when a tag for `src` is already present.
fn inject(src: &str) -> Result<Option<oneshot::Receiver<Result<(), String>>>, OAuthError> {
    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| load_error(src, "no document"))?;

    let selector = format!("script[src=\"{src}\"]");
    if document.query_selector(&selector).ok().flatten().is_some() {
        return Ok(None);
    }

    let script = document
        .create_element("script")
        .map_err(|e| load_error(src, format!("{e:?}")))?
        .dyn_into::<web_sys::HtmlScriptElement>()
        .map_err(|_| load_error(src, "created element is not a script"))?;
    script.set_src(src);
    script.set_async(true);
    script.set_defer(true);

    let (tx, rx) = oneshot::channel();
    let slot: Settle = Arc::new(Mutex::new(Some(tx)));
    let on_load = settle_handler(&slot, Ok(()));
    let on_error = settle_handler(&slot, Err("network or parse error".to_owned()));
    script.set_onload(Some(on_load.unchecked_ref()));
    script.set_onerror(Some(on_error.unchecked_ref()));

    let head = document.head().ok_or_else(|| load_error(src, "document has no <head>"))?;
    head.append_child(&script).map_err(|e| load_error(src, format!("{e:?}")))?;
    Ok(Some(rx))
}

#[async_trait::async_trait]
impl ScriptLoader for DocumentScripts {
    async fn load(&self, src: &str) -> Result<(), OAuthError> {
        let Some(rx) = inject(src)? else {
            tracing::debug!(src, "script tag already present");
            return Ok(());
        };
        match rx.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(reason)) => Err(load_error(src, reason)),
            Err(_) => Err(load_error(src, "load handler dropped")),
        }
    }
}

// =============================================================================
// google.accounts.id
// =============================================================================

/// The SDK as exposed on the window once the script has run.
#[derive(Debug, Default, Clone, Copy)]
pub struct GsiSdk;

/// `google.accounts.id`, looked up per call.
#[derive(Debug, Default, Clone, Copy)]
pub struct GsiClient;

fn accounts_id() -> Option<JsValue> {
    let mut value: JsValue = js_sys::global().into();
    for key in ["google", "accounts", "id"] {
        value = Reflect::get(&value, &JsValue::from_str(key)).ok()?;
        if value.is_undefined() || value.is_null() {
            return None;
        }
    }
    Some(value)
}

fn call_method(target: &JsValue, name: &str, arg: Option<&JsValue>) -> Result<JsValue, JsValue> {
    let method = Reflect::get(target, &JsValue::from_str(name))?.dyn_into::<Function>()?;
    match arg {
        Some(arg) => method.call1(target, arg),
        None => method.call0(target),
    }
}

fn set(target: &Object, key: &str, value: &JsValue) -> Result<(), JsValue> {
    Reflect::set(target, &JsValue::from_str(key), value).map(|_| ())
}

/// True when `notification.<name>()` returns `true`.
fn is_moment(notification: &JsValue, name: &str) -> bool {
    call_method(notification, name, None).is_ok_and(|v| v.as_bool() == Some(true))
}

fn prompt_moment(notification: &JsValue) -> Option<PromptMoment> {
    if is_moment(notification, "isNotDisplayed") {
        Some(PromptMoment::NotDisplayed)
    } else if is_moment(notification, "isSkippedMoment") {
        Some(PromptMoment::Skipped)
    } else if is_moment(notification, "isDismissedMoment") {
        Some(PromptMoment::Dismissed)
    } else if is_moment(notification, "isDisplayMoment") {
        Some(PromptMoment::Displayed)
    } else {
        None
    }
}

fn init_config(options: &InitOptions, callback: CredentialCallback) -> Result<Object, JsValue> {
    let config = Object::new();
    set(&config, "client_id", &JsValue::from_str(&options.client_id))?;
    set(&config, "auto_select", &JsValue::from_bool(options.auto_select))?;
    set(&config, "cancel_on_tap_outside", &JsValue::from_bool(options.cancel_on_tap_outside))?;

    let on_credential = Closure::<dyn FnMut(JsValue)>::new(move |response: JsValue| {
        let credential = Reflect::get(&response, &JsValue::from_str("credential"))
            .ok()
            .and_then(|v| v.as_string());
        if !callback.deliver(CredentialResponse { credential }) {
            tracing::debug!("late credential response ignored");
        }
    });
    set(&config, "callback", &on_credential.into_js_value())?;
    Ok(config)
}

impl IdentityClient for GsiClient {
    fn initialize(&self, options: InitOptions, callback: CredentialCallback) {
        let Some(id) = accounts_id() else {
            tracing::warn!("google.accounts.id missing at initialize");
            return;
        };
        let result = init_config(&options, callback).and_then(|config| call_method(&id, "initialize", Some(&config)));
        if let Err(err) = result {
            tracing::warn!(error = ?err, "google.accounts.id.initialize failed");
        }
    }

    fn prompt(&self, listener: Option<MomentListener>) {
        let Some(id) = accounts_id() else {
            tracing::warn!("google.accounts.id missing at prompt");
            return;
        };
        let result = match listener {
            Some(listener) => {
                let on_moment = Closure::<dyn FnMut(JsValue)>::new(move |notification: JsValue| {
                    if let Some(moment) = prompt_moment(&notification) {
                        listener(moment);
                    }
                });
                call_method(&id, "prompt", Some(&on_moment.into_js_value()))
            }
            None => call_method(&id, "prompt", None),
        };
        if let Err(err) = result {
            tracing::warn!(error = ?err, "google.accounts.id.prompt failed");
        }
    }
}

impl IdentitySdk for GsiSdk {
    fn identity_client(&self) -> Option<Arc<dyn IdentityClient>> {
        accounts_id().map(|_| Arc::new(GsiClient) as Arc<dyn IdentityClient>)
    }
}
