//! Idempotent external-script loading.
//!
//! Each source is loaded at most once per registry. Concurrent callers for the
//! same source share one in-flight load; a failed load is not cached, so the
//! next caller retries.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::OnceCell;

use super::OAuthError;

pub const GOOGLE_IDENTITY_SCRIPT: &str = "https://accounts.google.com/gsi/client";

/// Host-specific script injection (a `<script>` tag in the browser).
#[async_trait::async_trait]
pub trait ScriptLoader: Send + Sync {
    async fn load(&self, src: &str) -> Result<(), OAuthError>;
}

pub struct ScriptRegistry {
    loader: Arc<dyn ScriptLoader>,
    loaded: Mutex<HashMap<String, Arc<OnceCell<()>>>>,
}

impl ScriptRegistry {
    #[must_use]
    pub fn new(loader: Arc<dyn ScriptLoader>) -> Self {
        Self { loader, loaded: Mutex::new(HashMap::new()) }
    }

    /// Load `src` unless it is already loaded.
    ///
    /// # Errors
    ///
    /// Propagates the loader's error; the source stays unloaded.
    pub async fn ensure_loaded(&self, src: &str) -> Result<(), OAuthError> {
        let cell = self.cell(src);
        cell.get_or_try_init(|| async {
            tracing::debug!(src, "loading script");
            self.loader.load(src).await
        })
        .await?;
        Ok(())
    }

    #[must_use]
    pub fn is_loaded(&self, src: &str) -> bool {
        self.loaded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(src)
            .is_some_and(|cell| cell.initialized())
    }

    fn cell(&self, src: &str) -> Arc<OnceCell<()>> {
        self.loaded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(src.to_owned())
            .or_default()
            .clone()
    }
}

#[cfg(test)]
#[path = "script_test.rs"]
mod tests;
