//! The composition and send pipeline.
//!
//! Merges attachment uploads and message text into one atomic logical
//! send. The contract is all-or-nothing at the message level: if any file
//! in the batch fails to upload, no message is appended — a message
//! referencing only the surviving files is never created.

use tsunagu_shared::protocol::{SendMessageRequest, SendMessageResponse};
use tsunagu_shared::types::RoomId;

use crate::api::{MessagingApi, OutgoingFile};
use crate::error::ClientError;
use crate::uploader::{AttachmentUploader, UploadResult};

/// Validate, upload, and send.
///
/// Steps, in order, each aborting the whole send on failure:
/// 1. empty-content rejection (local, no network traffic);
/// 2. attachment upload with the aggregate ceiling checked up front;
/// 3. aggregation of any per-file failures into one error;
/// 4. a defensive count check against silent partial success;
/// 5. the send request itself, carrying the uploaded URLs.
pub async fn compose_and_send<A: MessagingApi>(
    api: &A,
    room: RoomId,
    content: &str,
    subject: Option<String>,
    files: &[OutgoingFile],
) -> Result<SendMessageResponse, ClientError> {
    if content.trim().is_empty() && files.is_empty() {
        return Err(ClientError::EmptyMessage);
    }

    let mut file_urls = Vec::with_capacity(files.len());
    if !files.is_empty() {
        let results = AttachmentUploader::new(api).upload(files).await?;

        let failed: Vec<String> = results
            .iter()
            .filter_map(|r| match r {
                UploadResult::Failed { file_name, .. } => Some(file_name.clone()),
                UploadResult::Uploaded { .. } => None,
            })
            .collect();
        if !failed.is_empty() {
            return Err(ClientError::PartialUpload { failed });
        }

        file_urls.extend(results.into_iter().filter_map(|r| match r {
            UploadResult::Uploaded { url, .. } => Some(url),
            UploadResult::Failed { .. } => None,
        }));

        // Every attempted file must have produced a URL; anything else is
        // silent partial success and the send must not proceed.
        if file_urls.len() != files.len() {
            return Err(ClientError::UploadCountMismatch {
                expected: files.len(),
                actual: file_urls.len(),
            });
        }
    }

    api.send_message(
        room,
        SendMessageRequest {
            content: content.to_string(),
            subject,
            file_urls,
        },
    )
    .await
}
