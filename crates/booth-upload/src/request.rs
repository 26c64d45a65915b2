//! Upload request and response types

/// One upload: raw payload bytes plus the multipart metadata describing
/// them. Immutable once constructed — the 401 retry re-sends the identical
/// payload.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub payload: Vec<u8>,
    /// Multipart field name (the Drive demo uses `file`)
    pub field_name: String,
    pub file_name: String,
    pub mime_type: String,
    /// Upload endpoint URL
    pub target: String,
}

/// Successful (2xx) server response to an upload.
#[derive(Debug, Clone)]
pub struct UploadResponse {
    pub status: u16,
    pub body: String,
}
