//! dqship multipart upload engine
//!
//! Streams a byte source of unknown length into an object store as a
//! sequence of bounded-size parts, one part in flight at a time, with
//! per-part retry and a final commit of the ordered part list.

pub mod client;
pub mod driver;
pub mod error;
pub mod multipart;
pub mod part;
pub mod s3;
pub mod store;
pub mod streaming;
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use client::{UploadOptions, Uploader};
pub use driver::{DriverState, UploadDriver};
pub use error::{ClientError, SessionOperation, StoreError};
pub use multipart::UploadSession;
pub use part::{Part, PartUploader, RetryPolicy};
pub use s3::{S3Config, S3Store};
pub use store::{MultipartStore, StoreResult};
pub use streaming::{file_source, ChunkAccumulator};

pub use tokio_util::sync::CancellationToken;

pub type Result<T> = std::result::Result<T, ClientError>;
