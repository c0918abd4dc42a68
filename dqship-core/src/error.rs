//! Error types for dqship

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DqshipError {
    #[error("Invalid bucket name: {0}")]
    InvalidBucketName(String),

    #[error("Invalid object key: {0}")]
    InvalidKey(String),

    #[error(
        "Configuration is invalid. Missing {} environment variables. Please set the following: {}",
        names.len(),
        names.join(", ")
    )]
    MissingConfig { names: Vec<String> },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl DqshipError {
    /// True for errors raised while loading or validating configuration
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            DqshipError::MissingConfig { .. }
                | DqshipError::InvalidConfig(_)
                | DqshipError::InvalidBucketName(_)
                | DqshipError::InvalidKey(_)
        )
    }
}
