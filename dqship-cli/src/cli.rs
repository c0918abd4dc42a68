//! Command-line flags layered over the environment configuration

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};

use crate::telemetry::LogFormat;

/// Flags that tune a run; everything else comes from the environment
#[derive(Debug, Clone, Default)]
pub struct Tuning {
    pub chunk_threshold: Option<usize>,
    pub max_attempts: Option<u32>,
    pub retry_delay_ms: Option<u64>,
    pub no_abort: bool,
    pub log_format: LogFormat,
    pub summary_json: bool,
}

pub fn command() -> Command {
    Command::new("dqship")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Back up a dqlite datastore and ship it to S3 as a multipart upload")
        .after_help(
            "Environment:\n  \
             AWS_REGION, KINE_ENDPOINT, BUCKET, KEY   required\n  \
             MIGRATOR_PATH                           backup binary (default /bin/migrator)\n  \
             DEBUG=true                              verbose migrator and logs\n  \
             AWS_ENDPOINT_URL                        S3-compatible endpoint",
        )
        .arg(
            Arg::new("chunk-threshold")
                .long("chunk-threshold")
                .value_name("BYTES")
                .help("Buffered bytes above which a part is uploaded")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("max-attempts")
                .long("max-attempts")
                .value_name("N")
                .help("Attempts per part, the first one included")
                .value_parser(value_parser!(u32)),
        )
        .arg(
            Arg::new("retry-delay-ms")
                .long("retry-delay-ms")
                .value_name("MS")
                .help("Pause between attempts of the same part")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("no-abort")
                .long("no-abort")
                .help("Leave the multipart upload open on failure instead of aborting it")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .value_name("FORMAT")
                .help("Log output format")
                .value_parser(["text", "json"])
                .default_value("text"),
        )
        .arg(
            Arg::new("summary-json")
                .long("summary-json")
                .help("Print the upload report as JSON on success")
                .action(ArgAction::SetTrue),
        )
}

impl Tuning {
    pub fn from_matches(matches: &ArgMatches) -> Self {
        let log_format = match matches.get_one::<String>("log-format").map(String::as_str) {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };

        Tuning {
            chunk_threshold: matches.get_one::<usize>("chunk-threshold").copied(),
            max_attempts: matches.get_one::<u32>("max-attempts").copied(),
            retry_delay_ms: matches.get_one::<u64>("retry-delay-ms").copied(),
            no_abort: matches.get_flag("no-abort"),
            log_format,
            summary_json: matches.get_flag("summary-json"),
        }
    }
}
