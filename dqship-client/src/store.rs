//! Object store protocol consumed by the upload engine

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use dqship_core::{CompletedPart, Destination, ObjectRef, PartNumber};

use crate::error::StoreError;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// A store client that speaks the create / upload-part / complete / abort
/// multipart protocol.
///
/// Implementations report every failure as a [`StoreError`]; retry decisions
/// belong to the caller.
#[async_trait]
pub trait MultipartStore: Send + Sync {
    /// Start a multipart upload and return the store-issued upload id
    async fn create_multipart_upload(&self, destination: &Destination) -> StoreResult<String>;

    /// Upload one part and return its entity tag
    async fn upload_part(
        &self,
        destination: &Destination,
        upload_id: &str,
        part_number: PartNumber,
        body: Bytes,
    ) -> StoreResult<String>;

    /// Commit the ordered part list into one object
    async fn complete_multipart_upload(
        &self,
        destination: &Destination,
        upload_id: &str,
        parts: &[CompletedPart],
    ) -> StoreResult<ObjectRef>;

    /// Discard an unfinished upload and any parts stored for it
    async fn abort_multipart_upload(&self, destination: &Destination, upload_id: &str) -> StoreResult<()>;
}

#[async_trait]
impl<T: MultipartStore + ?Sized> MultipartStore for Arc<T> {
    async fn create_multipart_upload(&self, destination: &Destination) -> StoreResult<String> {
        (**self).create_multipart_upload(destination).await
    }

    async fn upload_part(
        &self,
        destination: &Destination,
        upload_id: &str,
        part_number: PartNumber,
        body: Bytes,
    ) -> StoreResult<String> {
        (**self).upload_part(destination, upload_id, part_number, body).await
    }

    async fn complete_multipart_upload(
        &self,
        destination: &Destination,
        upload_id: &str,
        parts: &[CompletedPart],
    ) -> StoreResult<ObjectRef> {
        (**self).complete_multipart_upload(destination, upload_id, parts).await
    }

    async fn abort_multipart_upload(&self, destination: &Destination, upload_id: &str) -> StoreResult<()> {
        (**self).abort_multipart_upload(destination, upload_id).await
    }
}
