//! Run configuration, loaded from the environment

use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDateTime;
use dqship_client::{RetryPolicy, S3Config, UploadOptions};
use dqship_core::naming::resolve_object_key;
use dqship_core::{
    BucketName, Destination, DqshipError, Result, DEFAULT_CHUNK_THRESHOLD, DEFAULT_MAX_ATTEMPTS,
    MIN_PART_SIZE,
};

use crate::cli::Tuning;

pub const DEFAULT_MIGRATOR_PATH: &str = "/bin/migrator";

const KINE_PORT_SUFFIX: &str = ":12379";

const REQUIRED_VARS: [&str; 4] = ["AWS_REGION", "KINE_ENDPOINT", "BUCKET", "KEY"];

#[derive(Debug, Clone)]
pub struct Config {
    pub region: String,
    /// Local path of the kine unix socket
    pub kine_socket: PathBuf,
    pub destination: Destination,
    pub migrator_path: PathBuf,
    pub debug: bool,
    pub endpoint_url: Option<String>,
    pub upload: UploadOptions,
}

impl Config {
    pub fn from_env(tuning: &Tuning) -> Result<Self> {
        Self::from_lookup(
            |name| std::env::var(name).ok(),
            chrono::Local::now().naive_local(),
            tuning,
        )
    }

    /// Build the configuration from `lookup`.
    ///
    /// Every missing required variable is reported in a single error.
    pub fn from_lookup<F>(lookup: F, now: NaiveDateTime, tuning: &Tuning) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.is_empty());

        let missing: Vec<String> = REQUIRED_VARS
            .iter()
            .filter(|&&name| get(name).is_none())
            .map(|name| name.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(DqshipError::MissingConfig { names: missing });
        }

        let require = |name: &str| {
            get(name).ok_or_else(|| DqshipError::MissingConfig {
                names: vec![name.to_string()],
            })
        };

        let region = require("AWS_REGION")?;
        let kine_socket = PathBuf::from(trim_unix_socket(&require("KINE_ENDPOINT")?));
        let bucket = BucketName::new(&require("BUCKET")?)?;
        let key = resolve_object_key(Some(&require("KEY")?), now)?;

        let migrator_path = get("MIGRATOR_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_MIGRATOR_PATH));

        Ok(Config {
            region,
            kine_socket,
            destination: Destination::new(bucket, key),
            migrator_path,
            debug: debug_enabled(get("DEBUG").as_deref()),
            endpoint_url: get("AWS_ENDPOINT_URL"),
            upload: upload_options(tuning)?,
        })
    }

    /// Fail early when the socket or the migrator binary is absent
    pub fn check_inputs(&self) -> Result<()> {
        if !self.kine_socket.exists() {
            return Err(DqshipError::InvalidConfig(format!(
                "Kine endpoint {} can not be found.",
                self.kine_socket.display()
            )));
        }

        if !self.migrator_path.exists() {
            return Err(DqshipError::InvalidConfig(format!(
                "Migrator could not be found at {}.",
                self.migrator_path.display()
            )));
        }

        Ok(())
    }

    pub fn s3(&self) -> S3Config {
        S3Config {
            region: self.region.clone(),
            endpoint: self.endpoint_url.clone(),
        }
    }

    /// Endpoint passed to the migrator
    pub fn kine_endpoint(&self) -> String {
        format!("unix://{}", self.kine_socket.display())
    }
}

/// `unix:///var/lib/kine.sock:12379` becomes `/var/lib/kine.sock`
pub fn trim_unix_socket(endpoint: &str) -> String {
    let path = endpoint.strip_prefix("unix://").unwrap_or(endpoint);
    path.strip_suffix(KINE_PORT_SUFFIX).unwrap_or(path).to_string()
}

pub fn debug_enabled(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
}

fn upload_options(tuning: &Tuning) -> Result<UploadOptions> {
    let chunk_threshold = tuning.chunk_threshold.unwrap_or(DEFAULT_CHUNK_THRESHOLD);
    if chunk_threshold <= MIN_PART_SIZE {
        return Err(DqshipError::InvalidConfig(format!(
            "chunk threshold {} must be above the {} byte part minimum",
            chunk_threshold, MIN_PART_SIZE
        )));
    }

    let max_attempts = tuning.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS);
    if max_attempts == 0 {
        return Err(DqshipError::InvalidConfig(
            "max attempts must be at least 1".to_string(),
        ));
    }

    Ok(UploadOptions {
        chunk_threshold,
        retry: RetryPolicy {
            max_attempts,
            delay: Duration::from_millis(tuning.retry_delay_ms.unwrap_or(0)),
        },
        abort_on_failure: !tuning.no_abort,
    })
}
