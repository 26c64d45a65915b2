//! Credential-aware HTTP client
//!
//! Attaches the bearer token from the store at send time (never cached
//! earlier — a concurrent refresh may have replaced it), encodes the
//! multipart body, and owns the single built-in retry: one refresh followed
//! by one re-send when the endpoint answers 401. Every other failure is
//! terminal; in particular network failures are never retried, since a large
//! upload without idempotency keys could otherwise be duplicated.

use std::sync::Arc;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use tracing::{debug, warn};

use booth_auth::{AuthError, Credential, OAuthConfig, TokenStore, now_millis, refresh_token};

use crate::error::{Result, UploadError};
use crate::multipart;
use crate::request::{UploadRequest, UploadResponse};

/// HTTP client that authenticates requests from a shared [`TokenStore`].
pub struct AuthenticatedHttpClient {
    http: reqwest::Client,
    oauth: OAuthConfig,
    store: Arc<TokenStore>,
}

impl AuthenticatedHttpClient {
    pub fn new(oauth: OAuthConfig, store: Arc<TokenStore>, http: reqwest::Client) -> Self {
        Self { http, oauth, store }
    }

    /// Send one upload, refreshing the credential at most once on 401.
    ///
    /// Fails fast with [`UploadError::NotAuthenticated`] when the store is
    /// empty — triggering authorization is the orchestrator's job.
    pub async fn send(&self, request: &UploadRequest) -> Result<UploadResponse> {
        let Some(credential) = self.store.get().await else {
            return Err(UploadError::NotAuthenticated);
        };

        let first = self.post_multipart(request, &credential.access_token).await?;
        if first.status != 401 {
            return into_outcome(first);
        }

        let Some(refresh) = credential.refresh_token.clone() else {
            warn!("401 with no refresh token, full reauthorization needed");
            return Err(UploadError::Unauthorized);
        };

        debug!("upload returned 401, refreshing access token");
        let generation = self.store.begin_write();
        let response = refresh_token(&self.http, &self.oauth, &refresh)
            .await
            .map_err(|e| match e {
                // The network failed, not the credential
                AuthError::Transport(msg) => UploadError::Transport(msg),
                // Refresh token revoked or otherwise rejected
                _ => UploadError::Unauthorized,
            })?;

        let mut renewed = Credential::from_token_response(&response, now_millis(), &self.oauth.scopes);
        // A refresh response may omit the refresh token; the old one stays valid
        if renewed.refresh_token.is_none() {
            renewed.refresh_token = Some(refresh);
        }
        if !self.store.set(generation, renewed.clone()).await {
            debug!("refreshed credential superseded by a newer write");
        }

        let second = self.post_multipart(request, &renewed.access_token).await?;
        if second.status == 401 {
            warn!("second 401 after refresh, giving up");
            return Err(UploadError::Unauthorized);
        }
        into_outcome(second)
    }

    async fn post_multipart(&self, request: &UploadRequest, token: &str) -> Result<UploadResponse> {
        let encoded = multipart::encode(request);
        let response = self
            .http
            .post(&request.target)
            .timeout(self.oauth.request_timeout)
            .header(CONTENT_TYPE, &encoded.content_type)
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .body(encoded.bytes)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    UploadError::Transport(format!("upload timed out: {e}"))
                } else {
                    UploadError::Transport(format!("upload request failed: {e}"))
                }
            })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<no body>"));
        Ok(UploadResponse { status, body })
    }
}

fn into_outcome(response: UploadResponse) -> Result<UploadResponse> {
    if (200..300).contains(&response.status) {
        Ok(response)
    } else {
        Err(UploadError::Server {
            status: response.status,
            body: response.body,
        })
    }
}
