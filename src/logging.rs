//! Tracing setup. Console output always; optionally mirrored to an
//! append-only error log for operators.

use crate::error::Result;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber. `RUST_LOG` overrides the default `info` filter.
/// When `error_log` is set, warnings and errors are also appended to that file.
pub fn init_logging(error_log: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match error_log {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let file_writer = Mutex::new(file).with_max_level(tracing::Level::WARN);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr.and(file_writer))
                .with_ansi(false)
                .try_init()
                .ok();
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).try_init().ok();
        }
    }
    Ok(())
}
