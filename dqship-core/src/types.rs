//! Core data types for dqship

use serde::{Deserialize, Serialize};

/// Destination bucket in the object store
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BucketName(String);

impl BucketName {
    /// Create a new bucket name with validation
    pub fn new(name: &str) -> crate::Result<Self> {
        if name.is_empty() {
            return Err(crate::DqshipError::InvalidBucketName("empty name".to_string()));
        }

        // Buckets never contain separators or whitespace
        if name.chars().any(|c| c.is_whitespace() || c.is_control() || c == '/') {
            return Err(crate::DqshipError::InvalidBucketName(format!(
                "invalid characters in '{}'",
                name
            )));
        }

        Ok(BucketName(name.to_string()))
    }

    /// Get the bucket name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BucketName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Object key within a bucket
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectKey(String);

impl ObjectKey {
    /// Create a new key with validation
    pub fn new(key: &str) -> crate::Result<Self> {
        if key.is_empty() {
            return Err(crate::DqshipError::InvalidKey("empty key".to_string()));
        }

        if key.chars().any(|c| c.is_control()) {
            return Err(crate::DqshipError::InvalidKey(
                "control characters not allowed".to_string(),
            ));
        }

        Ok(ObjectKey(key.to_string()))
    }

    /// Get the key as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last path segment of the key
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }
}

impl std::fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where an upload lands: bucket plus key, immutable once built
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Destination {
    pub bucket: BucketName,
    pub key: ObjectKey,
}

impl Destination {
    pub fn new(bucket: BucketName, key: ObjectKey) -> Self {
        Destination { bucket, key }
    }

    /// Validate raw strings into a destination
    pub fn parse(bucket: &str, key: &str) -> crate::Result<Self> {
        Ok(Destination {
            bucket: BucketName::new(bucket)?,
            key: ObjectKey::new(key)?,
        })
    }
}

impl std::fmt::Display for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.bucket, self.key)
    }
}

/// 1-based part index assigned in emission order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PartNumber(u32);

impl PartNumber {
    pub const FIRST: PartNumber = PartNumber(1);

    /// Create from a raw value; zero is not a valid part number
    pub fn new(n: u32) -> Option<Self> {
        (n >= 1).then_some(PartNumber(n))
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// The part number that follows this one
    pub fn next(self) -> Self {
        PartNumber(self.0 + 1)
    }
}

impl Default for PartNumber {
    fn default() -> Self {
        Self::FIRST
    }
}

impl std::fmt::Display for PartNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Record of a part the store has confirmed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedPart {
    pub part_number: PartNumber,
    pub etag: String,
    pub size: u64,
}

/// The finalized object as reported by the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRef {
    pub bucket: BucketName,
    pub key: ObjectKey,
    pub etag: Option<String>,
}

/// Summary of a successful multipart upload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadReport {
    pub object: ObjectRef,
    pub upload_id: String,
    pub parts: usize,
    pub total_bytes: u64,
}

/// Check that parts are numbered 1, 2, 3, ... with no gaps or repeats
pub fn parts_are_sequential(parts: &[CompletedPart]) -> bool {
    parts
        .iter()
        .enumerate()
        .all(|(i, part)| part.part_number.get() == i as u32 + 1)
}
