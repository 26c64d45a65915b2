//! Error types for upload operations

use booth_auth::AuthError;

/// Errors from the authenticated upload path.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// No credential in the token store. The orchestrator, not the HTTP
    /// client, is responsible for authorizing first.
    #[error("not authenticated: no credential available")]
    NotAuthenticated,

    /// The endpoint rejected the credential even after the one permitted
    /// refresh. The caller must reauthorize by retrying the upload.
    #[error("unauthorized: credential rejected by the upload endpoint")]
    Unauthorized,

    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(String),

    /// Authorization was needed and failed; the upload was never attempted.
    #[error("authorization required: {0}")]
    AuthRequired(#[source] AuthError),
}

/// Result alias for upload operations.
pub type Result<T> = std::result::Result<T, UploadError>;
