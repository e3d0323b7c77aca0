//! File logging. The terminal belongs to the prompts, so the subscriber
//! only ever writes to the log file.

use std::{
    fs::{File, OpenOptions},
    path::{Path, PathBuf},
    sync::Mutex,
};

use tracing_subscriber::EnvFilter;

pub const LOG_FILE: &str = "/var/log/archinstall.log";
pub const FALLBACK_LOG_FILE: &str = "/tmp/archinstall.log";

/// Opens the first candidate that can be appended to.
fn open_first(candidates: &[&Path]) -> Option<(PathBuf, File)> {
    candidates.iter().find_map(|path| {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .ok()
            .map(|file| (path.to_path_buf(), file))
    })
}

/// Installs the global subscriber. Returns the log path, or `None` when
/// neither location is writable (logging is then off).
///
/// `RUST_LOG` overrides the default `debug` filter.
pub fn init() -> Option<PathBuf> {
    let (path, file) = open_first(&[Path::new(LOG_FILE), Path::new(FALLBACK_LOG_FILE)])?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .try_init()
        .ok()?;
    Some(path)
}
