//! Single-part upload with bounded retry

use std::time::Duration;

use bytes::Bytes;
use dqship_core::{CompletedPart, PartNumber, DEFAULT_MAX_ATTEMPTS};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::multipart::UploadSession;
use crate::store::MultipartStore;
use crate::{ClientError, Result};

/// One contiguous slice of the source, numbered in emission order
#[derive(Debug, Clone)]
pub struct Part {
    pub number: PartNumber,
    pub body: Bytes,
}

impl Part {
    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

/// How hard to try a single part before giving up
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, the first one included
    pub max_attempts: u32,
    /// Pause between attempts
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: Duration::ZERO,
        }
    }
}

/// Uploads parts one at a time and records each confirmed part on the session
#[derive(Debug, Clone)]
pub struct PartUploader {
    policy: RetryPolicy,
    cancel: CancellationToken,
}

impl PartUploader {
    pub fn new(policy: RetryPolicy, cancel: CancellationToken) -> Self {
        Self { policy, cancel }
    }

    /// Upload `part`, retrying transient failures up to the attempt cap.
    ///
    /// Every attempt resends the same body. The part is appended to the
    /// session only after the store confirms it. A cancelled token stops
    /// further attempts but never interrupts one already in flight.
    pub async fn upload<S>(
        &self,
        store: &S,
        session: &mut UploadSession,
        part: Part,
    ) -> Result<CompletedPart>
    where
        S: MultipartStore + ?Sized,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let size = part.len() as u64;
        let mut attempt = 0;

        loop {
            attempt += 1;

            let result = store
                .upload_part(
                    session.destination(),
                    session.upload_id(),
                    part.number,
                    part.body.clone(),
                )
                .await;

            match result {
                Ok(etag) => {
                    info!(
                        part_number = %part.number,
                        size_mb = size as f64 / 1024.0 / 1024.0,
                        etag = %etag,
                        attempt,
                        "Part uploaded"
                    );

                    let completed = CompletedPart {
                        part_number: part.number,
                        etag,
                        size,
                    };
                    session.record_part(completed.clone());
                    return Ok(completed);
                }
                Err(err) => {
                    warn!(
                        part_number = %part.number,
                        attempt,
                        max_attempts,
                        error = %err,
                        "Part upload attempt failed"
                    );

                    if attempt >= max_attempts || !err.is_retryable() {
                        return Err(ClientError::PartUploadFailed {
                            part_number: part.number,
                            attempts: attempt,
                            source: err,
                        });
                    }

                    if self.cancel.is_cancelled() {
                        return Err(ClientError::Cancelled);
                    }

                    if !self.policy.delay.is_zero() {
                        tokio::time::sleep(self.policy.delay).await;
                    }
                }
            }
        }
    }
}
