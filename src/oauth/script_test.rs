use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::*;

#[derive(Default)]
struct CountingLoader {
    calls: AtomicUsize,
    fail_first: bool,
}

#[async_trait::async_trait]
impl ScriptLoader for CountingLoader {
    async fn load(&self, src: &str) -> Result<(), OAuthError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        if self.fail_first && n == 0 {
            return Err(OAuthError::ScriptLoad { src: src.to_owned(), reason: "offline".into() });
        }
        Ok(())
    }
}

#[tokio::test]
async fn loads_each_source_once() {
    let loader = Arc::new(CountingLoader::default());
    let registry = ScriptRegistry::new(loader.clone());

    registry.ensure_loaded(GOOGLE_IDENTITY_SCRIPT).await.unwrap();
    registry.ensure_loaded(GOOGLE_IDENTITY_SCRIPT).await.unwrap();
    assert_eq!(loader.calls.load(Ordering::SeqCst), 1);
    assert!(registry.is_loaded(GOOGLE_IDENTITY_SCRIPT));

    registry.ensure_loaded("https://example.com/other.js").await.unwrap();
    assert_eq!(loader.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn concurrent_callers_share_one_load() {
    let loader = Arc::new(CountingLoader::default());
    let registry = Arc::new(ScriptRegistry::new(loader.clone()));

    let a = registry.clone();
    let b = registry.clone();
    let (ra, rb) = tokio::join!(a.ensure_loaded("s.js"), b.ensure_loaded("s.js"));
    ra.unwrap();
    rb.unwrap();
    assert_eq!(loader.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failed_load_is_retried() {
    let loader = Arc::new(CountingLoader { fail_first: true, ..CountingLoader::default() });
    let registry = ScriptRegistry::new(loader.clone());

    let err = registry.ensure_loaded("s.js").await.unwrap_err();
    assert!(matches!(err, OAuthError::ScriptLoad { .. }));
    assert!(!registry.is_loaded("s.js"));

    registry.ensure_loaded("s.js").await.unwrap();
    assert_eq!(loader.calls.load(Ordering::SeqCst), 2);
}
