//! Argument surface, per spec.md §6's CLI table.
use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "ingest",
    version,
    about = "Long-form audio ingestion pipeline",
    long_about = "Transforms a queue of video identifiers into speaker-attributed, \
                  semantically indexed transcript segments."
)]
pub struct Cli {
    /// Channel to enumerate (enumeration itself happens outside this binary;
    /// pass the resolved list via --from-json or --from-files alongside it).
    #[arg(long)]
    pub channel_url: Option<String>,

    /// One or more video ids / URLs, repeatable.
    #[arg(long = "from-url")]
    pub from_url: Vec<String>,

    /// Path to a JSON file containing an array of video descriptors.
    #[arg(long)]
    pub from_json: Option<PathBuf>,

    /// Path to a plain-text file, one video id or URL per line.
    #[arg(long)]
    pub from_files: Option<PathBuf>,

    /// Cap the number of videos enqueued this run.
    #[arg(long)]
    pub limit: Option<usize>,

    /// Treat `--limit` as "stop once N not-yet-processed videos are found",
    /// rather than a cap on the filtered candidate list.
    #[arg(long)]
    pub limit_unprocessed: bool,

    /// Only consider videos published on or after this ISO-8601 timestamp.
    #[arg(long)]
    pub since_published: Option<chrono::DateTime<chrono::Utc>>,

    /// Re-process videos even if they already have persisted segments.
    #[arg(long)]
    pub force: bool,

    /// Disable the existing-segments skip check entirely.
    #[arg(long)]
    pub no_skip_existing: bool,

    /// Resolve input and print the would-be run summary without acquiring,
    /// transcribing, or persisting anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Repeatable `KEY=VALUE` environment overrides, applied before config
    /// load — covers "overrides for any of the configuration keys" from
    /// spec.md §6 without a dedicated flag per key.
    #[arg(long = "set", value_parser = parse_key_val)]
    pub set: Vec<(String, String)>,

    /// Verbose (debug-level) logging.
    #[arg(short, long)]
    pub verbose: bool,
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((k, v)) => Ok((k.to_string(), v.to_string())),
        None => Err(format!("expected KEY=VALUE, got {s:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_set_overrides() {
        let cli = Cli::parse_from(["ingest", "--set", "IO_WORKERS=4", "--from-url", "abc"]);
        assert_eq!(cli.set, vec![("IO_WORKERS".to_string(), "4".to_string())]);
    }
}
