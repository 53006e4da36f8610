use thiserror::Error;

/// Errors surfaced to the UI layer. Validation variants are raised
/// locally, before any network call; the rest wrap server or transport
/// failures.
#[derive(Error, Debug)]
pub enum ClientError {
    /// A message must carry text or at least one attachment.
    #[error("Message is empty: add text or an attachment")]
    EmptyMessage,

    /// The attachment batch exceeds the aggregate size ceiling.
    #[error("Attachments total {total_bytes} bytes, exceeding the {max_bytes}-byte limit")]
    AttachmentsTooLarge { total_bytes: usize, max_bytes: usize },

    #[error("Too many attachments: {count} (max {max})")]
    TooManyAttachments { count: usize, max: usize },

    /// Some files in the batch failed to upload. The whole send is
    /// aborted; no partial message is created.
    #[error("Upload failed for: {}", failed.join(", "))]
    PartialUpload { failed: Vec<String> },

    /// Fewer URLs came back than files went up, with no reported error.
    #[error("Upload count mismatch: expected {expected} URLs, got {actual}")]
    UploadCountMismatch { expected: usize, actual: usize },

    /// A second send was attempted while one is in flight.
    #[error("A send is already in progress")]
    SendInFlight,

    #[error("No room is selected")]
    NoRoomSelected,

    /// The server answered with an error status.
    #[error("Server error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}
