//! Upload driver: turns a byte stream into an ordered run of uploaded parts

use std::io;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::multipart::UploadSession;
use crate::part::{Part, PartUploader, RetryPolicy};
use crate::store::MultipartStore;
use crate::streaming::ChunkAccumulator;
use crate::{ClientError, Result};

/// Lifecycle of a single driver run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Idle,
    Accumulating,
    Flushing,
    Completed,
    Failed,
}

/// Pulls chunks from a source, cuts parts and uploads them one at a time.
///
/// The source is not polled while a part is in flight, which bounds buffered
/// data to roughly one threshold's worth.
pub struct UploadDriver<'a, S: ?Sized> {
    store: &'a S,
    accumulator: ChunkAccumulator,
    uploader: PartUploader,
    cancel: CancellationToken,
    state: DriverState,
}

impl<'a, S> UploadDriver<'a, S>
where
    S: MultipartStore + ?Sized,
{
    pub fn new(
        store: &'a S,
        chunk_threshold: usize,
        retry: RetryPolicy,
        cancel: CancellationToken,
    ) -> Self {
        UploadDriver {
            store,
            accumulator: ChunkAccumulator::new(chunk_threshold),
            uploader: PartUploader::new(retry, cancel.clone()),
            cancel,
            state: DriverState::Idle,
        }
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    /// Drain `source` into `session`.
    ///
    /// On success every byte of the source has been uploaded and recorded.
    /// Any error leaves the driver `Failed`; the caller owns remote abort and
    /// local cleanup. Each run starts from an empty buffer at part 1, so bytes
    /// left over from an earlier failed run never reach a new session.
    pub async fn run<St>(&mut self, session: &mut UploadSession, source: St) -> Result<()>
    where
        St: Stream<Item = io::Result<Bytes>>,
    {
        let result = self.drain(session, source).await;

        match &result {
            Ok(()) => self.transition(DriverState::Completed),
            Err(err) => {
                match err.failed_part() {
                    Some(part_number) => error!(
                        part_number = %part_number,
                        error = %err,
                        "Multipart upload stopped"
                    ),
                    None => error!(error = %err, "Multipart upload stopped"),
                }
                self.transition(DriverState::Failed);
            }
        }

        result
    }

    async fn drain<St>(&mut self, session: &mut UploadSession, source: St) -> Result<()>
    where
        St: Stream<Item = io::Result<Bytes>>,
    {
        futures::pin_mut!(source);
        self.accumulator.reset();
        self.transition(DriverState::Accumulating);

        loop {
            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(ClientError::Cancelled),
                next = source.next() => next,
            };

            match next {
                Some(Ok(chunk)) => {
                    if let Some(part) = self.accumulator.push(&chunk) {
                        self.flush(session, part).await?;
                    }
                }
                Some(Err(err)) => return Err(ClientError::Source(err)),
                None => break,
            }
        }

        debug!(
            buffered = self.accumulator.buffered(),
            next_part = %self.accumulator.next_part_number(),
            "End of read stream"
        );

        if self.cancel.is_cancelled() {
            return Err(ClientError::Cancelled);
        }

        if let Some(part) = self.accumulator.finish() {
            self.flush(session, part).await?;
        }

        if session.parts().is_empty() {
            return Err(ClientError::EmptySource);
        }

        Ok(())
    }

    async fn flush(&mut self, session: &mut UploadSession, part: Part) -> Result<()> {
        self.transition(DriverState::Flushing);
        self.uploader.upload(self.store, session, part).await?;
        self.transition(DriverState::Accumulating);
        Ok(())
    }

    fn transition(&mut self, next: DriverState) {
        debug!(from = ?self.state, to = ?next, "Upload driver state change");
        self.state = next;
    }
}
