//! Attachment upload policy.
//!
//! The uploader enforces the aggregate batch ceiling before any network
//! traffic and reports per-file outcomes in order. It does not decide
//! what to do about failures; the composition pipeline owns that.

use tsunagu_shared::constants::{MAX_ATTACHMENTS_PER_MESSAGE, MAX_ATTACHMENT_BATCH_BYTES};

use crate::api::{MessagingApi, OutgoingFile};
use crate::error::ClientError;

/// Per-file outcome, index-aligned with the input batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadResult {
    Uploaded { url: String, file_name: String },
    Failed { file_name: String, reason: String },
}

pub struct AttachmentUploader<'a, A: MessagingApi> {
    api: &'a A,
}

impl<'a, A: MessagingApi> AttachmentUploader<'a, A> {
    pub fn new(api: &'a A) -> Self {
        Self { api }
    }

    /// Upload a batch of files.
    ///
    /// Returns `Err` only for precondition violations (count, aggregate
    /// size), which are checked before any upload starts. Individual
    /// upload failures come back as [`UploadResult::Failed`] entries.
    pub async fn upload(&self, files: &[OutgoingFile]) -> Result<Vec<UploadResult>, ClientError> {
        if files.len() > MAX_ATTACHMENTS_PER_MESSAGE {
            return Err(ClientError::TooManyAttachments {
                count: files.len(),
                max: MAX_ATTACHMENTS_PER_MESSAGE,
            });
        }

        let total_bytes: usize = files.iter().map(OutgoingFile::size).sum();
        if total_bytes > MAX_ATTACHMENT_BATCH_BYTES {
            return Err(ClientError::AttachmentsTooLarge {
                total_bytes,
                max_bytes: MAX_ATTACHMENT_BATCH_BYTES,
            });
        }

        let mut results = Vec::with_capacity(files.len());
        for file in files {
            match self.api.upload_attachment(file).await {
                Ok(response) => results.push(UploadResult::Uploaded {
                    url: response.url,
                    file_name: response.file_name,
                }),
                Err(e) => {
                    tracing::error!(file = %file.file_name, error = %e, "attachment upload failed");
                    results.push(UploadResult::Failed {
                        file_name: file.file_name.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }
        Ok(results)
    }
}
