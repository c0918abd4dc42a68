//! Multipart upload session

use dqship_core::*;
use tracing::{info, warn};

use crate::error::SessionOperation;
use crate::store::MultipartStore;
use crate::{ClientError, Result};

/// One live multipart destination.
///
/// Holds the store-issued upload id and the parts the store has confirmed,
/// in part-number order. Parts are only ever appended.
#[derive(Debug)]
pub struct UploadSession {
    upload_id: String,
    destination: Destination,
    parts: Vec<CompletedPart>,
}

impl UploadSession {
    /// Start a multipart upload on the store
    pub async fn open<S>(store: &S, destination: Destination) -> Result<Self>
    where
        S: MultipartStore + ?Sized,
    {
        let upload_id = store
            .create_multipart_upload(&destination)
            .await
            .map_err(|source| ClientError::Session {
                operation: SessionOperation::Create,
                source,
            })?;

        info!(
            bucket = %destination.bucket,
            key = %destination.key,
            upload_id = %upload_id,
            "Upload initiated"
        );

        Ok(UploadSession {
            upload_id,
            destination,
            parts: Vec::new(),
        })
    }

    /// Get upload ID
    pub fn upload_id(&self) -> &str {
        &self.upload_id
    }

    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    /// Confirmed parts, ordered by part number
    pub fn parts(&self) -> &[CompletedPart] {
        &self.parts
    }

    /// Bytes confirmed by the store so far
    pub fn total_bytes(&self) -> u64 {
        self.parts.iter().map(|p| p.size).sum()
    }

    /// Part number the next confirmed part must carry
    pub fn next_part_number(&self) -> PartNumber {
        self.parts
            .last()
            .map(|p| p.part_number.next())
            .unwrap_or(PartNumber::FIRST)
    }

    pub(crate) fn record_part(&mut self, part: CompletedPart) {
        debug_assert_eq!(part.part_number, self.next_part_number());
        self.parts.push(part);
    }

    /// Commit the recorded parts into one object.
    ///
    /// Fails without contacting the store when no part was recorded.
    pub async fn finalize<S>(&self, store: &S) -> Result<UploadReport>
    where
        S: MultipartStore + ?Sized,
    {
        if self.parts.is_empty() {
            return Err(ClientError::EmptySource);
        }

        info!(
            part_count = self.parts.len(),
            "All parts have been uploaded. Completing multipart upload."
        );

        let object = store
            .complete_multipart_upload(&self.destination, &self.upload_id, &self.parts)
            .await
            .map_err(|source| ClientError::Session {
                operation: SessionOperation::Complete,
                source,
            })?;

        info!(
            key = %object.key,
            upload_id = %self.upload_id,
            "Multipart upload completed successfully."
        );

        Ok(UploadReport {
            object,
            upload_id: self.upload_id.clone(),
            parts: self.parts.len(),
            total_bytes: self.total_bytes(),
        })
    }

    /// Abort the multipart upload
    pub async fn abort<S>(self, store: &S) -> Result<()>
    where
        S: MultipartStore + ?Sized,
    {
        warn!(
            upload_id = %self.upload_id,
            uploaded_parts = self.parts.len(),
            "Aborting multipart upload"
        );

        store
            .abort_multipart_upload(&self.destination, &self.upload_id)
            .await
            .map_err(|source| ClientError::Session {
                operation: SessionOperation::Abort,
                source,
            })
    }
}
