//! Loopback redirect listener
//!
//! The embedded-webview analogue: instead of relying on the OS to deliver a
//! custom-scheme redirect, this transport runs a short-lived axum server on
//! the loopback address named in the redirect URI and intercepts the
//! redirect request itself. The browser gets a small confirmation page; the
//! flow gets the full redirect URI.
//!
//! The server accepts exactly one redirect per `present` call and then shuts
//! down gracefully.

use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Mutex;

use axum::Router;
use axum::extract::State;
use axum::http::Uri;
use axum::response::{Html, IntoResponse};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::error::{AuthError, Result};
use crate::transport::{CallbackEvent, CallbackTransport};

const CONFIRMATION_PAGE: &str =
    "<html><body><p>Authorization received. You can close this window and return to the booth.</p></body></html>";

/// Callback transport backed by a loopback HTTP listener.
pub struct LoopbackTransport {
    listen_addr: SocketAddr,
    /// Listener bound eagerly so bind failures surface at construction and
    /// the resolved port (relevant with port 0) is known up front. Taken by
    /// the first `present`; later presents rebind `listen_addr`.
    listener: Mutex<Option<TcpListener>>,
    local_addr: SocketAddr,
    open_url: Box<dyn Fn(&str) + Send + Sync>,
}

#[derive(Clone)]
struct ListenerState {
    redirect_tx: mpsc::Sender<String>,
}

impl LoopbackTransport {
    /// Bind the listener and return the transport.
    ///
    /// `open_url` is invoked with the authorize URL once per `present`;
    /// typically it launches the system browser or prints the URL.
    pub async fn bind(
        listen_addr: SocketAddr,
        open_url: impl Fn(&str) + Send + Sync + 'static,
    ) -> Result<Self> {
        let listener = TcpListener::bind(listen_addr)
            .await
            .map_err(|e| AuthError::Transport(format!("binding loopback listener: {e}")))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| AuthError::Transport(format!("resolving loopback address: {e}")))?;
        info!(%local_addr, "loopback redirect listener bound");
        Ok(Self {
            listen_addr,
            listener: Mutex::new(Some(listener)),
            local_addr,
            open_url: Box::new(open_url),
        })
    }

    /// Address the listener is actually bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    async fn take_or_rebind(&self) -> Result<TcpListener> {
        let taken = {
            let mut slot = self.listener.lock().unwrap_or_else(|e| e.into_inner());
            slot.take()
        };
        match taken {
            Some(listener) => Ok(listener),
            None => TcpListener::bind(self.listen_addr)
                .await
                .map_err(|e| AuthError::Transport(format!("rebinding loopback listener: {e}"))),
        }
    }
}

impl CallbackTransport for LoopbackTransport {
    fn present<'a>(
        &'a self,
        authorize_url: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<CallbackEvent>> + Send + 'a>> {
        Box::pin(async move {
            let listener = self.take_or_rebind().await?;
            let local_addr = listener.local_addr().unwrap_or(self.local_addr);

            let (redirect_tx, mut redirect_rx) = mpsc::channel::<String>(1);
            let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

            let app = Router::new()
                .fallback(capture_redirect)
                .with_state(ListenerState { redirect_tx });

            let server = tokio::spawn(async move {
                axum::serve(listener, app)
                    .with_graceful_shutdown(async {
                        let _ = shutdown_rx.await;
                    })
                    .await
            });

            debug!("opening browser for authorization");
            (self.open_url)(authorize_url);

            // The router (and with it the only sender) lives in the server
            // task; recv returning None means the server died early.
            let received = redirect_rx.recv().await;
            let _ = shutdown_tx.send(());
            let _ = server.await;

            match received {
                Some(path_and_query) => {
                    let redirect_uri = format!("http://{local_addr}{path_and_query}");
                    debug!(%redirect_uri, "redirect received on loopback listener");
                    Ok(CallbackEvent::Redirect(redirect_uri))
                }
                None => Err(AuthError::Transport(
                    "loopback listener stopped before a redirect arrived".into(),
                )),
            }
        })
    }
}

async fn capture_redirect(State(state): State<ListenerState>, uri: Uri) -> impl IntoResponse {
    // Browsers also ask for /favicon.ico; only the redirect counts
    if uri.path() == "/favicon.ico" {
        return (axum::http::StatusCode::NOT_FOUND, Html("")).into_response();
    }
    // First redirect wins; the channel holds one slot and present shuts the
    // server down after reading it
    let _ = state.redirect_tx.try_send(uri.to_string());
    Html(CONFIRMATION_PAGE).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    async fn bound_transport() -> Arc<LoopbackTransport> {
        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
        Arc::new(LoopbackTransport::bind(addr, |_| {}).await.unwrap())
    }

    #[tokio::test]
    async fn redirect_request_resolves_present() {
        let transport = bound_transport().await;
        let local_addr = transport.local_addr();

        let presenter = transport.clone();
        let handle =
            tokio::spawn(async move { presenter.present("https://auth.example/authorize").await });

        let response = reqwest::get(format!(
            "http://{local_addr}/oauth2redirect?code=XYZ&state=S1"
        ))
        .await
        .unwrap();
        assert!(response.status().is_success());
        let page = response.text().await.unwrap();
        assert!(page.contains("close this window"), "got: {page}");

        let event = handle.await.unwrap().unwrap();
        assert_eq!(
            event,
            CallbackEvent::Redirect(format!(
                "http://{local_addr}/oauth2redirect?code=XYZ&state=S1"
            ))
        );
    }

    #[tokio::test]
    async fn favicon_request_does_not_resolve_present() {
        let transport = bound_transport().await;
        let local_addr = transport.local_addr();

        let presenter = transport.clone();
        let handle = tokio::spawn(async move { presenter.present("https://auth.example").await });

        let response = reqwest::get(format!("http://{local_addr}/favicon.ico"))
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 404);

        // The real redirect still lands afterwards
        reqwest::get(format!("http://{local_addr}/cb?code=A&state=S"))
            .await
            .unwrap();
        let event = handle.await.unwrap().unwrap();
        assert!(matches!(event, CallbackEvent::Redirect(uri) if uri.contains("code=A")));
    }

    #[tokio::test]
    async fn open_url_receives_the_authorize_url() {
        let (seen_tx, seen_rx) = std::sync::mpsc::channel::<String>();
        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let transport = Arc::new(
            LoopbackTransport::bind(addr, move |url| {
                let _ = seen_tx.send(url.to_string());
            })
            .await
            .unwrap(),
        );
        let local_addr = transport.local_addr();

        let presenter = transport.clone();
        let handle =
            tokio::spawn(async move { presenter.present("https://auth.example/a?x=1").await });

        reqwest::get(format!("http://{local_addr}/cb?code=A"))
            .await
            .unwrap();
        handle.await.unwrap().unwrap();

        assert_eq!(seen_rx.recv().unwrap(), "https://auth.example/a?x=1");
    }
}
