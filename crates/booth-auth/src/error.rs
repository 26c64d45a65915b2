//! Error types for the authorization flow

/// Errors from the authorization-code flow and token endpoint interactions.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("authorization cancelled by user")]
    Cancelled,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("callback state does not match the value sent in the authorize request")]
    CsrfMismatch,

    #[error("authorization server denied the request: {0}")]
    ProviderDenied(String),

    #[error("malformed callback: {0}")]
    MalformedCallback(String),

    #[error("token exchange failed with status {status}: {body}")]
    TokenExchangeFailed { status: u16, body: String },

    #[error("malformed token response: {0}")]
    MalformedTokenResponse(String),

    #[error("an authorization flow is already in progress")]
    AlreadyInProgress,
}

/// Result alias for authorization operations.
pub type Result<T> = std::result::Result<T, AuthError>;
