//! Callback transport abstraction
//!
//! The flow does not care how the authorization redirect finds its way back
//! into the process — a loopback HTTP listener intercepting the redirect, or
//! the host app receiving a custom-scheme URL from the OS. `present` hands
//! the authorize URL to the user and suspends until exactly one terminal
//! event arrives: the redirect, or a cancellation.
//!
//! Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility
//! (`Arc<dyn CallbackTransport>`).

use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;

use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::error::{AuthError, Result};

/// Terminal event of one `present` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackEvent {
    /// The full redirect URI, query string and all
    Redirect(String),
    /// The user backed out before authorizing
    Cancelled,
}

/// How the authorization redirect is delivered back into the flow.
///
/// Contract: each `present` call resolves with exactly one terminal event
/// (redirect or cancellation) or a transport error; it never resolves twice.
pub trait CallbackTransport: Send + Sync {
    /// Show the authorize URL to the user and suspend until the provider
    /// redirects back or the attempt is cancelled.
    fn present<'a>(
        &'a self,
        authorize_url: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<CallbackEvent>> + Send + 'a>>;
}

/// Transport for the system-browser + custom-URI-scheme arrangement.
///
/// `present` opens the browser via the injected callback and parks on a
/// oneshot channel. The host app resolves it from the outside when the OS
/// delivers the redirect ([`deliver_redirect`](Self::deliver_redirect)) or
/// the user gives up ([`cancel`](Self::cancel)).
pub struct SystemBrowserTransport {
    open_url: Box<dyn Fn(&str) + Send + Sync>,
    pending: Mutex<Option<oneshot::Sender<CallbackEvent>>>,
}

impl SystemBrowserTransport {
    /// `open_url` is invoked with the authorize URL once per `present`;
    /// typically it launches the system browser.
    pub fn new(open_url: impl Fn(&str) + Send + Sync + 'static) -> Self {
        Self {
            open_url: Box::new(open_url),
            pending: Mutex::new(None),
        }
    }

    /// Deliver the redirect URI the OS handed to the app.
    ///
    /// Returns `false` when no `present` is waiting (stale or duplicate
    /// delivery) — the event is dropped, never queued.
    pub fn deliver_redirect(&self, redirect_uri: String) -> bool {
        self.resolve(CallbackEvent::Redirect(redirect_uri))
    }

    /// Signal that the user abandoned the authorization.
    pub fn cancel(&self) -> bool {
        self.resolve(CallbackEvent::Cancelled)
    }

    fn resolve(&self, event: CallbackEvent) -> bool {
        let sender = self.take_pending();
        match sender {
            Some(tx) => tx.send(event).is_ok(),
            None => {
                warn!("callback event arrived with no pending authorization");
                false
            }
        }
    }

    fn take_pending(&self) -> Option<oneshot::Sender<CallbackEvent>> {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        pending.take()
    }

    fn install_pending(&self, tx: oneshot::Sender<CallbackEvent>) -> Result<()> {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        if pending.is_some() {
            return Err(AuthError::Transport(
                "a callback is already pending on this transport".into(),
            ));
        }
        *pending = Some(tx);
        Ok(())
    }
}

impl CallbackTransport for SystemBrowserTransport {
    fn present<'a>(
        &'a self,
        authorize_url: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<CallbackEvent>> + Send + 'a>> {
        Box::pin(async move {
            let (tx, rx) = oneshot::channel();
            self.install_pending(tx)?;

            debug!("opening system browser for authorization");
            (self.open_url)(authorize_url);

            rx.await.map_err(|_| {
                AuthError::Transport("callback channel closed without a redirect".into())
            })
        })
    }
}
