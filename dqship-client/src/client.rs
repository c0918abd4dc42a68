//! Main client implementation

use std::io;
use std::path::Path;

use bytes::Bytes;
use dqship_core::{Destination, UploadReport, DEFAULT_CHUNK_THRESHOLD};
use futures::Stream;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::driver::UploadDriver;
use crate::multipart::UploadSession;
use crate::part::RetryPolicy;
use crate::store::MultipartStore;
use crate::streaming::file_source;
use crate::{ClientError, Result};

/// Tuning for a multipart upload run
#[derive(Debug, Clone)]
pub struct UploadOptions {
    /// Buffered bytes above which a part is cut
    pub chunk_threshold: usize,
    pub retry: RetryPolicy,
    /// Abort the remote session when the run fails after it was opened
    pub abort_on_failure: bool,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            chunk_threshold: DEFAULT_CHUNK_THRESHOLD,
            retry: RetryPolicy::default(),
            abort_on_failure: true,
        }
    }
}

/// Streams sources into multipart uploads on a store
pub struct Uploader<S> {
    store: S,
    options: UploadOptions,
}

impl<S: MultipartStore> Uploader<S> {
    pub fn new(store: S, options: UploadOptions) -> Self {
        Uploader { store, options }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn options(&self) -> &UploadOptions {
        &self.options
    }

    /// Upload everything `source` yields to `destination`.
    ///
    /// Opens the session, drives parts through the store sequentially and
    /// finalizes. Failures after the session opened abort it when
    /// `abort_on_failure` is set.
    pub async fn upload_stream<St>(
        &self,
        destination: Destination,
        source: St,
        cancel: &CancellationToken,
    ) -> Result<UploadReport>
    where
        St: Stream<Item = io::Result<Bytes>>,
    {
        if cancel.is_cancelled() {
            return Err(ClientError::Cancelled);
        }

        let mut session = UploadSession::open(&self.store, destination).await?;

        let mut driver = UploadDriver::new(
            &self.store,
            self.options.chunk_threshold,
            self.options.retry.clone(),
            cancel.clone(),
        );

        let outcome = match driver.run(&mut session, source).await {
            Ok(()) => session.finalize(&self.store).await,
            Err(err) => Err(err),
        };

        match outcome {
            Ok(report) => {
                info!(
                    bucket = %report.object.bucket,
                    key = %report.object.key,
                    parts = report.parts,
                    total_bytes = report.total_bytes,
                    "Upload finished"
                );
                Ok(report)
            }
            Err(err) => {
                self.abandon(session).await;
                Err(err)
            }
        }
    }

    /// Upload a file from disk
    pub async fn upload_file(
        &self,
        destination: Destination,
        path: impl AsRef<Path>,
        cancel: &CancellationToken,
    ) -> Result<UploadReport> {
        let source = file_source(path).await.map_err(ClientError::Source)?;
        self.upload_stream(destination, source, cancel).await
    }

    async fn abandon(&self, session: UploadSession) {
        if !self.options.abort_on_failure {
            warn!(
                upload_id = %session.upload_id(),
                "Leaving multipart upload unfinished on the store"
            );
            return;
        }

        let upload_id = session.upload_id().to_string();
        if let Err(err) = session.abort(&self.store).await {
            warn!(upload_id = %upload_id, error = %err, "Failed to abort multipart upload");
        }
    }
}
