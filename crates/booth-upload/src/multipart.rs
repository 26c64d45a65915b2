//! multipart/form-data encoding (RFC 2388)
//!
//! One part carrying the payload bytes under the configured field name. The
//! boundary is generated per request from 24 random bytes and re-drawn in
//! the (astronomically unlikely) case that the payload happens to contain
//! it, so the body can never be cut short by its own delimiter.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngExt;

use crate::request::UploadRequest;

/// An encoded multipart body ready to send.
#[derive(Debug)]
pub struct EncodedBody {
    /// Value for the Content-Type header, boundary included
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Encode the request payload as a single-part multipart/form-data body.
pub fn encode(request: &UploadRequest) -> EncodedBody {
    let boundary = generate_boundary(&request.payload);

    let mut bytes = Vec::with_capacity(request.payload.len() + 256);
    bytes.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    bytes.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            request.field_name, request.file_name
        )
        .as_bytes(),
    );
    bytes.extend_from_slice(format!("Content-Type: {}\r\n\r\n", request.mime_type).as_bytes());
    bytes.extend_from_slice(&request.payload);
    bytes.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    EncodedBody {
        content_type: format!("multipart/form-data; boundary={boundary}"),
        bytes,
    }
}

/// Draw a random boundary guaranteed absent from the payload.
///
/// 24 random bytes as URL-safe base64 give a 32-character token; a collision
/// with arbitrary payload bytes is a ~2^-192 event, but the loop makes the
/// guarantee unconditional rather than probabilistic.
fn generate_boundary(payload: &[u8]) -> String {
    loop {
        let mut bytes = [0u8; 24];
        rand::rng().fill(&mut bytes);
        let candidate = format!("booth{}", URL_SAFE_NO_PAD.encode(bytes));
        if !contains_subslice(payload, candidate.as_bytes()) {
            return candidate;
        }
    }
}

fn contains_subslice(haystack: &[u8], needle: &[u8]) -> bool {
    haystack
        .windows(needle.len())
        .any(|window| window == needle)
}
