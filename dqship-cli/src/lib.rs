//! dqship: back up a dqlite datastore and ship it to S3
//!
//! The binary runs the migrator, packs its output into a `.tar.gz` and
//! streams the archive through the multipart upload engine.

pub mod archive;
pub mod backup;
pub mod cleanup;
pub mod cli;
pub mod config;
pub mod pipeline;
pub mod signals;
pub mod telemetry;

pub use config::Config;
pub use pipeline::{run_and_clean_up, run_backup, WorkPaths};
