//! Typed notifications for UI collaborators.
//!
//! SYSTEM CONTEXT
//! ==============
//! This layer never renders anything. Login dialogs and toast hosts subscribe
//! to the bus and react to the signals published here: the navigation guard
//! asks for a login prompt or reports an expired session, and the HTTP
//! pipeline posts one notice per classified failure.

use tokio::sync::broadcast;

use crate::http::ErrorKind;

const DEFAULT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A user-facing toast message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    /// Set when the notice comes from a classified HTTP failure.
    pub kind: Option<ErrorKind>,
    pub message: String,
}

impl Notice {
    #[must_use]
    pub fn warning(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Warning, kind: None, message: message.into() }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Error, kind: None, message: message.into() }
    }

    #[must_use]
    pub fn http_failure(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Error, kind: Some(kind), message: message.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    /// Open the login dialog.
    LoginRequired,
    /// The stored credential was rejected and has been cleared.
    SessionExpired,
    Notice(Notice),
}

impl Signal {
    /// Stable name for logging and filtering.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::LoginRequired => "login-required",
            Self::SessionExpired => "session-expired",
            Self::Notice(_) => "notice",
        }
    }
}

/// Broadcast bus for [`Signal`]s. Clones publish to the same subscribers.
///
/// Publishing with no subscribers is not an error; signals are simply dropped.
#[derive(Debug, Clone)]
pub struct SignalBus {
    tx: broadcast::Sender<Signal>,
}

impl SignalBus {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Signal> {
        self.tx.subscribe()
    }

    pub fn emit(&self, signal: Signal) {
        tracing::debug!(signal = signal.name(), "signal emitted");
        let _ = self.tx.send(signal);
    }

    pub fn notify(&self, notice: Notice) {
        self.emit(Signal::Notice(notice));
    }
}

impl Default for SignalBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Drain every signal currently queued on `rx` without waiting.
///
/// Lagged receivers skip the lost signals and keep draining.
pub fn drain(rx: &mut broadcast::Receiver<Signal>) -> Vec<Signal> {
    let mut out = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(signal) => out.push(signal),
            Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "signal receiver lagged");
            }
            Err(broadcast::error::TryRecvError::Empty | broadcast::error::TryRecvError::Closed) => break,
        }
    }
    out
}

#[cfg(test)]
#[path = "signal_test.rs"]
mod tests;
