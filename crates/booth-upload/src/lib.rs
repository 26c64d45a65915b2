//! Authenticated multipart upload library
//!
//! Sits on top of `booth-auth`: given raw image bytes from the UI layer, the
//! [`UploadOrchestrator`] makes sure a usable credential exists (running the
//! authorization flow if not) and pushes the bytes to the configured upload
//! endpoint as `multipart/form-data` with a bearer token attached.
//!
//! The [`AuthenticatedHttpClient`] owns the one built-in retry in the whole
//! system: a single refresh-then-retry on HTTP 401. Everything else is
//! terminal and reported to the caller as a typed [`UploadError`].

pub mod client;
pub mod error;
pub mod multipart;
pub mod orchestrator;
pub mod request;

pub use client::AuthenticatedHttpClient;
pub use error::{Result, UploadError};
pub use orchestrator::{UploadOrchestrator, UploadTarget};
pub use request::{UploadRequest, UploadResponse};
