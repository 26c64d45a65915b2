//! OAuth client configuration
//!
//! Endpoint URLs and client identity are injected here rather than baked in
//! as constants: the demo targets Google Drive, but nothing in the flow is
//! provider-specific. The client secret is wrapped in [`common::Secret`] so
//! it never appears in Debug output or logs.

use std::time::Duration;

use common::Secret;

/// Default network timeout applied to token exchange, refresh, and upload.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for one OAuth client.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    /// Optional and provider-dependent. When `None`, the `client_secret`
    /// form field is omitted entirely from token requests.
    pub client_secret: Option<Secret<String>>,
    pub authorize_endpoint: String,
    pub token_endpoint: String,
    /// Where the authorization server redirects after consent. Either a
    /// loopback http URL or a custom app scheme.
    pub redirect_uri: String,
    pub scopes: Vec<String>,
    /// Opt-in escape hatch for providers that do not round-trip `state`.
    /// Disables CSRF protection on the callback — leave this off unless the
    /// provider forces your hand.
    pub skip_state_check: bool,
    /// Per-request timeout for token exchange, refresh, and upload calls.
    pub request_timeout: Duration,
}

impl OAuthConfig {
    /// Build a config with no client secret, state checking on, and the
    /// default request timeout.
    pub fn new(
        client_id: impl Into<String>,
        authorize_endpoint: impl Into<String>,
        token_endpoint: impl Into<String>,
        redirect_uri: impl Into<String>,
        scopes: Vec<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: None,
            authorize_endpoint: authorize_endpoint.into(),
            token_endpoint: token_endpoint.into(),
            redirect_uri: redirect_uri.into(),
            scopes,
            skip_state_check: false,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_client_secret(mut self, secret: Secret<String>) -> Self {
        self.client_secret = Some(secret);
        self
    }

    /// Disable the callback state check. Documented as reducing security;
    /// only for providers that do not echo `state` back.
    pub fn with_skip_state_check(mut self) -> Self {
        self.skip_state_check = true;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Validate the config before wiring it into the flow.
    pub fn validate(&self) -> common::Result<()> {
        if self.client_id.is_empty() {
            return Err(common::Error::Config("client_id must not be empty".into()));
        }
        for (name, url) in [
            ("authorize_endpoint", &self.authorize_endpoint),
            ("token_endpoint", &self.token_endpoint),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(common::Error::Config(format!(
                    "{name} must start with http:// or https://, got: {url}"
                )));
            }
        }
        if self.redirect_uri.is_empty() {
            return Err(common::Error::Config(
                "redirect_uri must not be empty".into(),
            ));
        }
        if self.scopes.is_empty() {
            return Err(common::Error::Config(
                "at least one scope must be configured".into(),
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(common::Error::Config(
                "request_timeout must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}
