//! S3 implementation of the multipart store protocol

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Builder as S3ConfigBuilder, Region};
use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart as S3CompletedPart};
use aws_sdk_s3::Client;
use bytes::Bytes;
use dqship_core::{CompletedPart, Destination, ObjectKey, ObjectRef, PartNumber};
use tracing::{debug, info};

use crate::error::StoreError;
use crate::store::{MultipartStore, StoreResult};

/// Connection settings for an S3-compatible store
#[derive(Debug, Clone)]
pub struct S3Config {
    pub region: String,
    /// Custom endpoint (MinIO and friends); implies path-style addressing
    pub endpoint: Option<String>,
}

/// Multipart store backed by the AWS SDK
#[derive(Debug, Clone)]
pub struct S3Store {
    client: Client,
}

impl S3Store {
    /// Build a client from the default credential chain and `config`
    pub async fn connect(config: &S3Config) -> Self {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .load()
            .await;

        let mut builder = S3ConfigBuilder::from(&sdk_config);
        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        debug!(region = %config.region, endpoint = ?config.endpoint, "S3 client configured");
        Self::from_client(Client::from_conf(builder.build()))
    }

    pub fn from_client(client: Client) -> Self {
        S3Store { client }
    }
}

fn sdk_error<E, R>(operation: &str, err: SdkError<E, R>) -> StoreError
where
    E: std::error::Error + 'static,
    R: std::fmt::Debug,
{
    // Requests the SDK could not even build will not improve on retry
    let retryable = !matches!(err, SdkError::ConstructionFailure(_));
    let message = format!("{}: {}", operation, DisplayErrorContext(err));

    if retryable {
        StoreError::transient(message)
    } else {
        StoreError::permanent(message)
    }
}

fn s3_part_number(part_number: PartNumber) -> StoreResult<i32> {
    i32::try_from(part_number.get())
        .map_err(|_| StoreError::permanent(format!("part number {} out of range", part_number)))
}

#[async_trait]
impl MultipartStore for S3Store {
    async fn create_multipart_upload(&self, destination: &Destination) -> StoreResult<String> {
        let response = self
            .client
            .create_multipart_upload()
            .bucket(destination.bucket.as_str())
            .key(destination.key.as_str())
            .send()
            .await
            .map_err(|e| sdk_error("CreateMultipartUpload", e))?;

        let upload_id = response
            .upload_id()
            .ok_or_else(|| StoreError::permanent("CreateMultipartUpload: response has no upload id"))?
            .to_string();

        info!(
            key = response.key().unwrap_or(destination.key.as_str()),
            upload_id = %upload_id,
            encryption = response.server_side_encryption().map(|s| s.as_str()).unwrap_or("none"),
            "S3 multipart upload created"
        );

        Ok(upload_id)
    }

    async fn upload_part(
        &self,
        destination: &Destination,
        upload_id: &str,
        part_number: PartNumber,
        body: Bytes,
    ) -> StoreResult<String> {
        let content_length = body.len() as i64;

        let response = self
            .client
            .upload_part()
            .bucket(destination.bucket.as_str())
            .key(destination.key.as_str())
            .upload_id(upload_id)
            .part_number(s3_part_number(part_number)?)
            .content_length(content_length)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| sdk_error("UploadPart", e))?;

        response
            .e_tag()
            .map(str::to_string)
            .ok_or_else(|| StoreError::transient(format!("UploadPart: no ETag for part {}", part_number)))
    }

    async fn complete_multipart_upload(
        &self,
        destination: &Destination,
        upload_id: &str,
        parts: &[CompletedPart],
    ) -> StoreResult<ObjectRef> {
        let mut completed = Vec::with_capacity(parts.len());
        for part in parts {
            completed.push(
                S3CompletedPart::builder()
                    .part_number(s3_part_number(part.part_number)?)
                    .e_tag(part.etag.clone())
                    .build(),
            );
        }

        let response = self
            .client
            .complete_multipart_upload()
            .bucket(destination.bucket.as_str())
            .key(destination.key.as_str())
            .upload_id(upload_id)
            .multipart_upload(
                CompletedMultipartUpload::builder()
                    .set_parts(Some(completed))
                    .build(),
            )
            .send()
            .await
            .map_err(|e| sdk_error("CompleteMultipartUpload", e))?;

        let key = match response.key() {
            Some(key) => ObjectKey::new(key)
                .map_err(|e| StoreError::permanent(format!("CompleteMultipartUpload: {}", e)))?,
            None => destination.key.clone(),
        };

        Ok(ObjectRef {
            bucket: destination.bucket.clone(),
            key,
            etag: response.e_tag().map(str::to_string),
        })
    }

    async fn abort_multipart_upload(&self, destination: &Destination, upload_id: &str) -> StoreResult<()> {
        self.client
            .abort_multipart_upload()
            .bucket(destination.bucket.as_str())
            .key(destination.key.as_str())
            .upload_id(upload_id)
            .send()
            .await
            .map_err(|e| sdk_error("AbortMultipartUpload", e))?;

        info!(upload_id = %upload_id, "S3 multipart upload aborted");
        Ok(())
    }
}
