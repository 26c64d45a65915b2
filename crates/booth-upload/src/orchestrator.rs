//! Upload orchestration
//!
//! The single entry point the UI layer calls: hand over the snapshot bytes,
//! get back a terminal outcome. The orchestrator decides whether an
//! authorization is needed before the upload — the HTTP client never
//! triggers one — and it never authorizes more than once per call; a failed
//! authorization surfaces to the caller, who may retry the upload
//! explicitly.

use std::sync::Arc;

use tracing::{debug, info};

use booth_auth::{
    AuthorizationCodeFlow, CallbackTransport, OAuthConfig, TokenStore, now_millis,
};

use crate::client::AuthenticatedHttpClient;
use crate::error::{Result, UploadError};
use crate::request::{UploadRequest, UploadResponse};

/// Where and how the payload is uploaded. Field defaults match the Drive
/// photo-booth demo.
#[derive(Debug, Clone)]
pub struct UploadTarget {
    pub endpoint: String,
    pub field_name: String,
    pub file_name: String,
    pub mime_type: String,
}

impl UploadTarget {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            field_name: "file".into(),
            file_name: "incognito_photo".into(),
            mime_type: "image/jpg".into(),
        }
    }
}

/// Single-session upload coordinator: one token store, one flow, one
/// authenticated client, one callback transport.
pub struct UploadOrchestrator {
    flow: AuthorizationCodeFlow,
    client: AuthenticatedHttpClient,
    store: Arc<TokenStore>,
    transport: Arc<dyn CallbackTransport>,
    target: UploadTarget,
}

impl UploadOrchestrator {
    /// Wire up a fresh session. The config should have passed
    /// [`OAuthConfig::validate`] first.
    pub fn new(
        oauth: OAuthConfig,
        target: UploadTarget,
        transport: Arc<dyn CallbackTransport>,
    ) -> Self {
        let store = Arc::new(TokenStore::new());
        let http = reqwest::Client::new();
        Self {
            flow: AuthorizationCodeFlow::new(oauth.clone(), store.clone(), http.clone()),
            client: AuthenticatedHttpClient::new(oauth, store.clone(), http),
            store,
            transport,
            target,
        }
    }

    /// The session's token store, e.g. for clearing the credential on
    /// account switch.
    pub fn token_store(&self) -> &Arc<TokenStore> {
        &self.store
    }

    /// Upload one payload, authorizing first if the session has no usable
    /// credential.
    ///
    /// An expired-but-refreshable credential goes straight to the client,
    /// which refreshes on 401; only an absent or dead credential triggers
    /// the interactive flow.
    pub async fn upload(&self, payload: Vec<u8>) -> Result<UploadResponse> {
        let usable = match self.store.get().await {
            Some(credential) => credential.is_usable_at(now_millis()),
            None => false,
        };

        if !usable {
            info!("no usable credential, starting authorization");
            self.flow
                .authorize(self.transport.as_ref())
                .await
                .map_err(UploadError::AuthRequired)?;
        } else {
            debug!("existing credential is usable, skipping authorization");
        }

        let request = UploadRequest {
            payload,
            field_name: self.target.field_name.clone(),
            file_name: self.target.file_name.clone(),
            mime_type: self.target.mime_type.clone(),
            target: self.target.endpoint.clone(),
        };
        self.client.send(&request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use booth_auth::{AuthError, CallbackEvent, Credential};
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Counts presents; answers with a matching-state redirect or a
    /// cancellation.
    struct CountingTransport {
        presents: AtomicUsize,
        cancel: bool,
    }

    impl CountingTransport {
        fn redirecting() -> Self {
            Self {
                presents: AtomicUsize::new(0),
                cancel: false,
            }
        }

        fn cancelling() -> Self {
            Self {
                presents: AtomicUsize::new(0),
                cancel: true,
            }
        }

        fn present_count(&self) -> usize {
            self.presents.load(Ordering::SeqCst)
        }
    }

    impl CallbackTransport for CountingTransport {
        fn present<'a>(
            &'a self,
            authorize_url: &'a str,
        ) -> Pin<Box<dyn Future<Output = booth_auth::Result<CallbackEvent>> + Send + 'a>> {
            Box::pin(async move {
                self.presents.fetch_add(1, Ordering::SeqCst);
                if self.cancel {
                    return Ok(CallbackEvent::Cancelled);
                }
                let url = reqwest::Url::parse(authorize_url).unwrap();
                let state = url
                    .query_pairs()
                    .find(|(k, _)| k == "state")
                    .map(|(_, v)| v.into_owned())
                    .unwrap();
                Ok(CallbackEvent::Redirect(format!(
                    "http://127.0.0.1:7878/oauth2redirect?code=XYZ&state={state}"
                )))
            })
        }
    }

    fn oauth_config(base: &str) -> OAuthConfig {
        OAuthConfig::new(
            "abc",
            "https://accounts.google.com/o/oauth2/auth",
            format!("{base}/token"),
            "http://127.0.0.1:7878/oauth2redirect",
            vec!["drive".into()],
        )
    }

    async fn mock_token_endpoint(server: &MockServer, expected: u64) {
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "T1",
                "refresh_token": "R1",
                "expires_in": 3600
            })))
            .expect(expected)
            .mount(server)
            .await;
    }

    fn valid_credential() -> Credential {
        Credential {
            access_token: "at_valid".into(),
            refresh_token: Some("rt_1".into()),
            expires_at: None,
            scopes: vec!["drive".into()],
        }
    }

    #[tokio::test]
    async fn cold_start_authorizes_then_uploads() {
        let server = MockServer::start().await;
        mock_token_endpoint(&server, 1).await;
        Mock::given(method("POST"))
            .and(path("/upload"))
            .and(body_string_contains("name=\"file\""))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"id":"1"}"#))
            .expect(1)
            .mount(&server)
            .await;

        let transport = Arc::new(CountingTransport::redirecting());
        let orchestrator = UploadOrchestrator::new(
            oauth_config(&server.uri()),
            UploadTarget::new(format!("{}/upload", server.uri())),
            transport.clone(),
        );

        let response = orchestrator.upload(vec![0x01, 0x02]).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(transport.present_count(), 1);
    }

    #[tokio::test]
    async fn valid_credential_never_triggers_second_authorization() {
        let server = MockServer::start().await;
        mock_token_endpoint(&server, 0).await;
        Mock::given(method("POST"))
            .and(path("/upload"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(2)
            .mount(&server)
            .await;

        let transport = Arc::new(CountingTransport::redirecting());
        let orchestrator = UploadOrchestrator::new(
            oauth_config(&server.uri()),
            UploadTarget::new(format!("{}/upload", server.uri())),
            transport.clone(),
        );
        let store = orchestrator.token_store();
        store.set(store.begin_write(), valid_credential()).await;

        orchestrator.upload(vec![1]).await.unwrap();
        orchestrator.upload(vec![2]).await.unwrap();
        assert_eq!(transport.present_count(), 0);
    }

    #[tokio::test]
    async fn cancelled_authorization_skips_the_upload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let transport = Arc::new(CountingTransport::cancelling());
        let orchestrator = UploadOrchestrator::new(
            oauth_config(&server.uri()),
            UploadTarget::new(format!("{}/upload", server.uri())),
            transport.clone(),
        );

        let err = orchestrator.upload(vec![1, 2, 3]).await.unwrap_err();
        assert!(matches!(
            err,
            UploadError::AuthRequired(AuthError::Cancelled)
        ));
        assert_eq!(transport.present_count(), 1);
    }

    #[tokio::test]
    async fn expired_refreshable_credential_skips_interactive_flow() {
        let server = MockServer::start().await;
        // The 401 + refresh path handles the expired token; no authorize
        Mock::given(method("POST"))
            .and(path("/upload"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&server)
            .await;

        let transport = Arc::new(CountingTransport::redirecting());
        let orchestrator = UploadOrchestrator::new(
            oauth_config(&server.uri()),
            UploadTarget::new(format!("{}/upload", server.uri())),
            transport.clone(),
        );
        let store = orchestrator.token_store();
        store
            .set(
                store.begin_write(),
                Credential {
                    access_token: "at_expired".into(),
                    refresh_token: Some("rt_1".into()),
                    expires_at: Some(1), // long past
                    scopes: vec!["drive".into()],
                },
            )
            .await;

        orchestrator.upload(vec![1]).await.unwrap();
        assert_eq!(transport.present_count(), 0);
    }

    #[tokio::test]
    async fn dead_credential_triggers_reauthorization() {
        let server = MockServer::start().await;
        mock_token_endpoint(&server, 1).await;
        Mock::given(method("POST"))
            .and(path("/upload"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&server)
            .await;

        let transport = Arc::new(CountingTransport::redirecting());
        let orchestrator = UploadOrchestrator::new(
            oauth_config(&server.uri()),
            UploadTarget::new(format!("{}/upload", server.uri())),
            transport.clone(),
        );
        let store = orchestrator.token_store();
        // Expired and unrefreshable: only a new authorization helps
        store
            .set(
                store.begin_write(),
                Credential {
                    access_token: "at_dead".into(),
                    refresh_token: None,
                    expires_at: Some(1),
                    scopes: vec![],
                },
            )
            .await;

        orchestrator.upload(vec![1]).await.unwrap();
        assert_eq!(transport.present_count(), 1);
    }
}
