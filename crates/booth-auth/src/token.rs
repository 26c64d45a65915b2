//! OAuth token endpoint interactions
//!
//! Handles the two POSTs to the token endpoint:
//! 1. Authorization code exchange (`grant_type=authorization_code`)
//! 2. Token refresh (`grant_type=refresh_token`)
//!
//! Both use `application/x-www-form-urlencoded` bodies per RFC 6749. The
//! `client_secret` field is sent only when configured — some providers
//! (public clients) have none, and omitting the field beats sending an
//! empty value.

use serde::Deserialize;
use tracing::debug;

use crate::config::OAuthConfig;
use crate::error::{AuthError, Result};

/// Token endpoint JSON response for both exchange and refresh.
///
/// Only `access_token` is guaranteed; everything else is provider-dependent.
/// `expires_in` is a delta in seconds from the response time — the caller
/// converts it to an absolute timestamp when building a credential. A
/// refresh response may omit `refresh_token`, in which case the old one
/// stays valid.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Seconds until the access token expires (delta, not absolute)
    pub expires_in: Option<u64>,
    pub token_type: Option<String>,
    /// Space-separated granted scopes, when the provider reports them
    pub scope: Option<String>,
}

/// Exchange an authorization code for tokens.
///
/// Second step of the grant: the user authorized in their browser and the
/// callback delivered the code. A non-2xx status is
/// [`AuthError::TokenExchangeFailed`]; a 2xx body that does not parse (in
/// particular, one missing `access_token`) is
/// [`AuthError::MalformedTokenResponse`].
pub async fn exchange_code(
    client: &reqwest::Client,
    config: &OAuthConfig,
    code: &str,
) -> Result<TokenResponse> {
    let mut form: Vec<(&str, &str)> = vec![
        ("grant_type", "authorization_code"),
        ("code", code),
        ("client_id", &config.client_id),
        ("redirect_uri", &config.redirect_uri),
    ];
    if let Some(secret) = &config.client_secret {
        form.push(("client_secret", secret.expose()));
    }

    debug!(endpoint = %config.token_endpoint, "exchanging authorization code");
    post_token_request(client, config, &form).await
}

/// Refresh an access token using a refresh token.
///
/// Called by the upload client after a 401. Exactly one refresh attempt is
/// made per failed request; retry policy lives with the caller.
pub async fn refresh_token(
    client: &reqwest::Client,
    config: &OAuthConfig,
    refresh: &str,
) -> Result<TokenResponse> {
    let mut form: Vec<(&str, &str)> = vec![
        ("grant_type", "refresh_token"),
        ("refresh_token", refresh),
        ("client_id", &config.client_id),
    ];
    if let Some(secret) = &config.client_secret {
        form.push(("client_secret", secret.expose()));
    }

    debug!(endpoint = %config.token_endpoint, "refreshing access token");
    post_token_request(client, config, &form).await
}

async fn post_token_request(
    client: &reqwest::Client,
    config: &OAuthConfig,
    form: &[(&str, &str)],
) -> Result<TokenResponse> {
    let response = client
        .post(&config.token_endpoint)
        .timeout(config.request_timeout)
        .form(form)
        .send()
        .await
        .map_err(|e| {
            if e.is_timeout() {
                AuthError::Transport(format!("token endpoint timed out: {e}"))
            } else {
                AuthError::Transport(format!("token request failed: {e}"))
            }
        })?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<no body>"));
        return Err(AuthError::TokenExchangeFailed {
            status: status.as_u16(),
            body,
        });
    }

    response
        .json::<TokenResponse>()
        .await
        .map_err(|e| AuthError::MalformedTokenResponse(e.to_string()))
}
