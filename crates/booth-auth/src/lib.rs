//! OAuth2 authorization-code-grant library
//!
//! Drives the browser-based authorization step, the code-for-token exchange,
//! and refresh for a single account session. This crate is a standalone
//! library with no dependency on any upload logic — it can be tested and
//! used independently.
//!
//! Credential flow:
//! 1. Caller builds an [`OAuthConfig`] and a [`TokenStore`]
//! 2. [`AuthorizationCodeFlow::authorize`] generates the CSRF state and hands
//!    the authorize URL to a [`CallbackTransport`]
//! 3. The transport resolves with the redirect carrying `code` + `state`
//! 4. The flow validates the callback and calls [`token::exchange_code`]
//! 5. The resulting [`Credential`] is written to the store with a
//!    generation tag
//! 6. Consumers call [`token::refresh_token`] when the access token expires

pub mod config;
pub mod credential;
pub mod error;
pub mod flow;
pub mod loopback;
pub mod state;
pub mod store;
pub mod token;
pub mod transport;

pub use config::OAuthConfig;
pub use credential::{Credential, now_millis};
pub use error::{AuthError, Result};
pub use flow::AuthorizationCodeFlow;
pub use loopback::LoopbackTransport;
pub use state::generate_state;
pub use store::{Generation, TokenStore};
pub use token::{TokenResponse, exchange_code, refresh_token};
pub use transport::{CallbackEvent, CallbackTransport, SystemBrowserTransport};
