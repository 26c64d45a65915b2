//! Authorization-code-grant flow
//!
//! Drives one authorization attempt end to end: generate the CSRF state,
//! build the authorize URL, hand it to the transport, validate the redirect,
//! exchange the code, and store the credential under the generation reserved
//! when the attempt started.
//!
//! Callback validation order, each a distinct failure:
//! 1. transport error or cancellation
//! 2. `state` mismatch (no exchange is attempted, the store is untouched)
//! 3. `error` parameter from the provider
//! 4. missing `code`

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use reqwest::Url;
use tracing::{debug, info, warn};

use crate::config::OAuthConfig;
use crate::credential::{Credential, now_millis};
use crate::error::{AuthError, Result};
use crate::state::generate_state;
use crate::store::TokenStore;
use crate::token;
use crate::transport::{CallbackEvent, CallbackTransport};

/// One OAuth client's authorization driver. At most one authorization may be
/// in flight per instance; a second `authorize` fails with
/// [`AuthError::AlreadyInProgress`] so state values are never orphaned or
/// double-consumed.
pub struct AuthorizationCodeFlow {
    config: OAuthConfig,
    http: reqwest::Client,
    store: Arc<TokenStore>,
    in_flight: AtomicBool,
}

/// Resets the in-flight flag on every exit path, including cancellation of
/// the authorize future.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Parameters extracted from the authorization redirect.
#[derive(Debug, Default)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

impl AuthorizationCodeFlow {
    pub fn new(config: OAuthConfig, store: Arc<TokenStore>, http: reqwest::Client) -> Self {
        Self {
            config,
            http,
            store,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Run one full authorization attempt through the given transport.
    ///
    /// On success the credential has been written to the token store (unless
    /// a newer write already superseded it) and is also returned.
    pub async fn authorize(&self, transport: &dyn CallbackTransport) -> Result<Credential> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            return Err(AuthError::AlreadyInProgress);
        }
        let _guard = InFlightGuard(&self.in_flight);

        // Reserve the store generation at attempt start, so a refresh that
        // starts after us and completes before us wins the store
        let generation = self.store.begin_write();

        let state = generate_state();
        let authorize_url = self.authorize_url(&state)?;
        debug!(endpoint = %self.config.authorize_endpoint, "presenting authorize URL");

        let redirect_uri = match transport.present(&authorize_url).await? {
            CallbackEvent::Redirect(uri) => uri,
            CallbackEvent::Cancelled => {
                info!("authorization cancelled before a redirect arrived");
                return Err(AuthError::Cancelled);
            }
        };

        let credential = self.handle_callback(&redirect_uri, &state).await?;

        if self.store.set(generation, credential.clone()).await {
            info!("authorization complete, credential stored");
        } else {
            warn!("authorization result superseded by a newer credential write");
        }
        Ok(credential)
    }

    /// Validate a redirect against the expected state and exchange its code.
    ///
    /// Public for hosts that receive the redirect out-of-band and drive the
    /// transport themselves. Does not write to the token store.
    pub async fn handle_callback(
        &self,
        redirect_uri: &str,
        expected_state: &str,
    ) -> Result<Credential> {
        let params = parse_callback_params(redirect_uri)?;

        // Exact byte comparison, no normalization. A missing state counts
        // as a mismatch: an attacker would simply drop the parameter.
        if !self.config.skip_state_check && params.state.as_deref() != Some(expected_state) {
            warn!("callback state mismatch, aborting before token exchange");
            return Err(AuthError::CsrfMismatch);
        }

        if let Some(error) = params.error {
            return Err(AuthError::ProviderDenied(error));
        }

        let code = params.code.ok_or_else(|| {
            AuthError::MalformedCallback("redirect carried no authorization code".into())
        })?;

        let response = token::exchange_code(&self.http, &self.config, &code).await?;
        Ok(Credential::from_token_response(
            &response,
            now_millis(),
            &self.config.scopes,
        ))
    }

    /// Build the authorize URL: endpoint plus `client_id`, `redirect_uri`,
    /// space-joined `scope`, `state`, and `response_type=code`.
    fn authorize_url(&self, state: &str) -> Result<String> {
        let mut url = Url::parse(&self.config.authorize_endpoint).map_err(|e| {
            AuthError::Transport(format!(
                "invalid authorize endpoint {}: {e}",
                self.config.authorize_endpoint
            ))
        })?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &self.config.redirect_uri)
            .append_pair("scope", &self.config.scopes.join(" "))
            .append_pair("state", state)
            .append_pair("response_type", "code");
        Ok(url.into())
    }
}

/// Pull `code` / `state` / `error` out of the redirect. Parameters normally
/// arrive in the query string; if the query carries none of them the
/// fragment is parsed the same way.
fn parse_callback_params(redirect_uri: &str) -> Result<CallbackParams> {
    let url = Url::parse(redirect_uri)
        .map_err(|e| AuthError::MalformedCallback(format!("unparseable redirect URI: {e}")))?;

    let params = collect_params(url.query_pairs());
    if params.code.is_some() || params.state.is_some() || params.error.is_some() {
        return Ok(params);
    }

    if let Some(fragment) = url.fragment() {
        // Some providers put the response in the fragment; parse it like a
        // query string
        let synthetic = Url::parse(&format!("http://fragment/?{fragment}"))
            .map_err(|e| AuthError::MalformedCallback(format!("unparseable fragment: {e}")))?;
        return Ok(collect_params(synthetic.query_pairs()));
    }

    Ok(params)
}

fn collect_params<'a>(pairs: impl Iterator<Item = (std::borrow::Cow<'a, str>, std::borrow::Cow<'a, str>)>) -> CallbackParams {
    let mut params = CallbackParams::default();
    for (key, value) in pairs {
        match key.as_ref() {
            "code" => params.code = Some(value.into_owned()),
            "state" => params.state = Some(value.into_owned()),
            "error" => params.error = Some(value.into_owned()),
            _ => {}
        }
    }
    params
}
