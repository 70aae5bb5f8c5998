use crate::config::{ArgError, ExtraArgs};
use anyhow::{Context, Result};
use std::fs::File;
use std::sync::Mutex;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

pub fn usage() -> &'static str {
    "logging arguments:
  --log-file=FILE        output destination file (default is stderr)
  --log-level=LEVEL      message output threshold, one of the following:
                           * silent
                           * error
                           * warning
                           * success
                           * info (default)
                           * verbose
                           * debug
                         RUST_LOG overrides the level when set.
  --verbose              enable verbose logging (same as --log-level=verbose)
  --debug                enable debug logging   (same as --log-level=debug)
"
}

/// Maps the forwarded logging flags to a tracing filter directive.
pub fn level_directive(extra: &ExtraArgs) -> Result<&'static str, ArgError> {
    if extra.flag("debug") || extra.flag("verbose") {
        return Ok("debug");
    }
    match extra.value("log-level") {
        None => Ok("info"),
        Some("silent") => Ok("off"),
        Some("error") => Ok("error"),
        Some("warning") => Ok("warn"),
        Some("success") | Some("info") => Ok("info"),
        Some("verbose") | Some("debug") => Ok("debug"),
        Some(other) => Err(ArgError::InvalidValue {
            key: "log-level".to_string(),
            value: other.to_string(),
        }),
    }
}

pub fn init_tracing(extra: &ExtraArgs) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => EnvFilter::new(level_directive(extra)?),
    };
    let writer = match extra.value("log-file") {
        None | Some("stderr") => BoxMakeWriter::new(std::io::stderr),
        Some("stdout") => BoxMakeWriter::new(std::io::stdout),
        Some(path) => {
            let file = File::create(path).with_context(|| format!("failed to open log file {path}"))?;
            BoxMakeWriter::new(Mutex::new(file))
        }
    };
    // A second initialization (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .try_init();
    Ok(())
}
