//! Tracing setup for the server and the one-shot CLI commands.
//!
//! Console output goes to stdout while serving. `docqa index` and `docqa ask` print their JSON
//! result on stdout, so they log to stderr instead. A second, non-blocking layer writes to disk:
//! `DOCQA_LOG_FILE` names a file to append to (`off` disables file logging), otherwise logs roll
//! under `DOCQA_LOG_DIR` (default `logs/`) with the rotation chosen by `DOCQA_LOG_ROTATION`.
use std::path::PathBuf;
use std::sync::OnceLock;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const DEFAULT_FILTER: &str = "info";
const DEFAULT_LOG_DIR: &str = "logs";
const LOG_FILE_PREFIX: &str = "docqa.log";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Where console logs are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Console {
    /// Long-running server.
    Stdout,
    /// Commands whose stdout carries a JSON result.
    Stderr,
}

/// Destination of the file layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSink {
    /// No file logging.
    Disabled,
    /// Append to a single named file.
    Append(PathBuf),
    /// `docqa.log` files in a directory, rotated on the given schedule.
    Rolling {
        /// Directory holding the log files.
        dir: PathBuf,
        /// Rotation schedule.
        rotation: Rotation,
    },
}

/// Logging options resolved from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    /// `EnvFilter` directive string.
    pub filter: String,
    /// File layer destination.
    pub file: FileSink,
}

impl LogSettings {
    /// Resolve settings from an arbitrary variable source.
    ///
    /// `RUST_LOG` wins over `DOCQA_LOG`; both fall back to `info`. Unknown rotation names fall
    /// back to never rotating.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let filter = non_empty("RUST_LOG")
            .or_else(|| non_empty("DOCQA_LOG"))
            .unwrap_or_else(|| DEFAULT_FILTER.to_string());

        let file = match non_empty("DOCQA_LOG_FILE") {
            Some(path) if path.eq_ignore_ascii_case("off") => FileSink::Disabled,
            Some(path) => FileSink::Append(PathBuf::from(path)),
            None => FileSink::Rolling {
                dir: PathBuf::from(
                    non_empty("DOCQA_LOG_DIR").unwrap_or_else(|| DEFAULT_LOG_DIR.to_string()),
                ),
                rotation: parse_rotation(non_empty("DOCQA_LOG_ROTATION").as_deref()),
            },
        };

        Self { filter, file }
    }
}

fn parse_rotation(value: Option<&str>) -> Rotation {
    match value.map(str::to_ascii_lowercase).as_deref() {
        Some("daily") => Rotation::DAILY,
        Some("hourly") => Rotation::HOURLY,
        Some("minutely") => Rotation::MINUTELY,
        _ => Rotation::NEVER,
    }
}

/// Install the global subscriber: a compact console layer and, when available, a file layer.
///
/// The non-blocking writer's guard is held in a static so buffered lines flush at exit.
pub fn init_tracing(console: Console) {
    let settings = LogSettings::from_lookup(|key| std::env::var(key).ok());
    let env_filter =
        EnvFilter::try_new(&settings.filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let console_writer = match console {
        Console::Stdout => BoxMakeWriter::new(std::io::stdout),
        Console::Stderr => BoxMakeWriter::new(std::io::stderr),
    };
    let console_layer = fmt::layer()
        .with_writer(console_writer)
        .with_target(false)
        .compact();

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer);

    if let Some(writer) = file_writer(&settings.file) {
        let file_layer = fmt::layer()
            .with_writer(writer)
            .with_target(true)
            .with_ansi(false)
            .compact();
        registry.with(file_layer).init();
    } else {
        registry.init();
    }
}

/// Open the file sink. Failures are reported on stderr and leave console logging only.
fn file_writer(sink: &FileSink) -> Option<NonBlocking> {
    let (writer, guard) = match sink {
        FileSink::Disabled => return None,
        FileSink::Append(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|err| eprintln!("docqa: cannot open log file {}: {err}", path.display()))
                .ok()?;
            tracing_appender::non_blocking(file)
        }
        FileSink::Rolling { dir, rotation } => {
            let appender = RollingFileAppender::builder()
                .rotation(rotation.clone())
                .filename_prefix(LOG_FILE_PREFIX)
                .build(dir)
                .map_err(|err| eprintln!("docqa: cannot log to {}: {err}", dir.display()))
                .ok()?;
            tracing_appender::non_blocking(appender)
        }
    };
    let _ = LOG_GUARD.set(guard);
    Some(writer)
}
