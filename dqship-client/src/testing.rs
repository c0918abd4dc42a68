//! In-memory multipart store for tests
//!
//! Records every call, keeps part bodies so finished objects can be read
//! back, and injects failures per operation or per part number.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use bytes::Bytes;
use dqship_core::*;

use crate::error::StoreError;
use crate::store::{MultipartStore, StoreResult};

/// A call observed by [`MemoryStore`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Create,
    UploadPart { part_number: u32, size: usize },
    Complete { parts: usize },
    Abort,
}

impl StoreCall {
    pub fn is_part_upload(&self) -> bool {
        matches!(self, StoreCall::UploadPart { .. })
    }
}

#[derive(Debug)]
struct PendingUpload {
    destination: Destination,
    parts: BTreeMap<u32, (String, Bytes)>,
}

#[derive(Debug, Default)]
struct State {
    next_upload: u64,
    next_etag: u64,
    uploads: HashMap<String, PendingUpload>,
    objects: HashMap<Destination, Vec<u8>>,
    aborted: Vec<String>,
    calls: Vec<StoreCall>,
    attempts: HashMap<u32, u32>,
    // part number -> transient failures left to inject
    failing_parts: HashMap<u32, u32>,
    rejected_parts: Vec<u32>,
    fail_create: bool,
    fail_complete: bool,
    fail_abort: bool,
    in_flight: usize,
    max_in_flight: usize,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Fail the next `times` attempts of `part_number` with a transient error
    pub fn fail_part(&self, part_number: u32, times: u32) {
        self.lock().failing_parts.insert(part_number, times);
    }

    /// Fail every attempt of `part_number` with a permanent error
    pub fn reject_part(&self, part_number: u32) {
        self.lock().rejected_parts.push(part_number);
    }

    pub fn fail_create(&self) {
        self.lock().fail_create = true;
    }

    pub fn fail_complete(&self) {
        self.lock().fail_complete = true;
    }

    pub fn fail_abort(&self) {
        self.lock().fail_abort = true;
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.lock().calls.clone()
    }

    /// Attempts made for `part_number`, failed ones included
    pub fn part_attempts(&self, part_number: u32) -> u32 {
        self.lock().attempts.get(&part_number).copied().unwrap_or(0)
    }

    /// Largest number of part uploads observed running at once
    pub fn max_in_flight(&self) -> usize {
        self.lock().max_in_flight
    }

    /// Contents of a finalized object
    pub fn object(&self, destination: &Destination) -> Option<Vec<u8>> {
        self.lock().objects.get(destination).cloned()
    }

    /// Upload ids that were aborted, in order
    pub fn aborted_uploads(&self) -> Vec<String> {
        self.lock().aborted.clone()
    }

    /// Uploads neither completed nor aborted
    pub fn pending_uploads(&self) -> usize {
        self.lock().uploads.len()
    }
}

#[async_trait]
impl MultipartStore for MemoryStore {
    async fn create_multipart_upload(&self, destination: &Destination) -> StoreResult<String> {
        let mut state = self.lock();
        state.calls.push(StoreCall::Create);

        if state.fail_create {
            return Err(StoreError::permanent("AccessDenied: create refused"));
        }

        state.next_upload += 1;
        let upload_id = format!("upload-{}", state.next_upload);
        state.uploads.insert(
            upload_id.clone(),
            PendingUpload {
                destination: destination.clone(),
                parts: BTreeMap::new(),
            },
        );
        Ok(upload_id)
    }

    async fn upload_part(
        &self,
        _destination: &Destination,
        upload_id: &str,
        part_number: PartNumber,
        body: Bytes,
    ) -> StoreResult<String> {
        let n = part_number.get();
        {
            let mut state = self.lock();
            state.calls.push(StoreCall::UploadPart {
                part_number: n,
                size: body.len(),
            });
            *state.attempts.entry(n).or_insert(0) += 1;
            state.in_flight += 1;
            state.max_in_flight = state.max_in_flight.max(state.in_flight);
        }

        // Give a concurrent caller the chance to overlap
        tokio::task::yield_now().await;

        let mut state = self.lock();
        state.in_flight -= 1;

        if state.rejected_parts.contains(&n) {
            return Err(StoreError::permanent(format!("EntityTooLarge: part {}", n)));
        }

        if let Some(left) = state.failing_parts.get_mut(&n) {
            if *left > 0 {
                *left -= 1;
                return Err(StoreError::transient(format!("connection reset on part {}", n)));
            }
        }

        state.next_etag += 1;
        let etag = format!("\"etag-{}\"", state.next_etag);
        let upload = state
            .uploads
            .get_mut(upload_id)
            .ok_or_else(|| StoreError::permanent(format!("NoSuchUpload: {}", upload_id)))?;

        // Re-uploading a part number replaces the earlier copy
        upload.parts.insert(n, (etag.clone(), body));
        Ok(etag)
    }

    async fn complete_multipart_upload(
        &self,
        destination: &Destination,
        upload_id: &str,
        parts: &[CompletedPart],
    ) -> StoreResult<ObjectRef> {
        let mut state = self.lock();
        state.calls.push(StoreCall::Complete { parts: parts.len() });

        if state.fail_complete {
            return Err(StoreError::permanent("InternalError: complete refused"));
        }

        if parts.is_empty() {
            return Err(StoreError::permanent("MalformedXML: no parts"));
        }

        if !parts_are_sequential(parts) {
            return Err(StoreError::permanent("InvalidPartOrder"));
        }

        let upload = state
            .uploads
            .get(upload_id)
            .ok_or_else(|| StoreError::permanent(format!("NoSuchUpload: {}", upload_id)))?;

        let mut object = Vec::new();
        for part in parts {
            match upload.parts.get(&part.part_number.get()) {
                Some((etag, body)) if *etag == part.etag => object.extend_from_slice(body),
                _ => {
                    return Err(StoreError::permanent(format!(
                        "InvalidPart: {}",
                        part.part_number
                    )))
                }
            }
        }

        let upload = state.uploads.remove(upload_id).ok_or_else(|| {
            StoreError::permanent(format!("NoSuchUpload: {}", upload_id))
        })?;
        debug_assert_eq!(&upload.destination, destination);
        state.objects.insert(destination.clone(), object);

        Ok(ObjectRef {
            bucket: destination.bucket.clone(),
            key: destination.key.clone(),
            etag: Some(format!("\"{}-{}\"", upload_id, parts.len())),
        })
    }

    async fn abort_multipart_upload(&self, _destination: &Destination, upload_id: &str) -> StoreResult<()> {
        let mut state = self.lock();
        state.calls.push(StoreCall::Abort);

        if state.fail_abort {
            return Err(StoreError::transient("SlowDown: abort refused"));
        }

        state.uploads.remove(upload_id);
        state.aborted.push(upload_id.to_string());
        Ok(())
    }
}
