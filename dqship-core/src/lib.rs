//! Core data models and types for dqship

pub mod error;
pub mod naming;
pub mod types;

pub use error::*;
pub use types::*;

/// Result type alias for dqship operations
pub type Result<T> = std::result::Result<T, DqshipError>;

/// Smallest non-final part the object store accepts (5 MiB)
pub const MIN_PART_SIZE: usize = 5 * 1024 * 1024;

/// Buffered bytes above which a part is flushed (10 MiB)
pub const DEFAULT_CHUNK_THRESHOLD: usize = 10 * 1024 * 1024;

/// Total attempts per part, the first one included
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Read size used when streaming an archive from disk (64 KiB)
pub const DEFAULT_READ_CHUNK_SIZE: usize = 64 * 1024;
