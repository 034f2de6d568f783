//! Rolling file logs for processes that embed the code stores.
//!
//! The logger is driven by the `[logging]` config section. Without a `dir`
//! nothing is installed and `log` macros stay no-ops. Once a logger is
//! running, the process keeps it: asking again with the same section is a
//! no-op, asking with a different one is an error.

use crate::config::LoggingConfig;
use flexi_logger::{
    Cleanup, Criterion, FileSpec, LogSpecification, Logger, LoggerHandle, Naming, WriteMode,
};
use log::{info, LevelFilter};
use once_cell::sync::OnceCell;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

const LOG_FILE_BASENAME: &str = "codetable";
const ROTATE_AT_BYTES: u64 = 10 * 1024 * 1024;
const KEEP_ROTATED_FILES: usize = 5;

static ACTIVE_LOGGER: OnceCell<ActiveLogger> = OnceCell::new();

struct ActiveLogger {
    level: LevelFilter,
    dir: PathBuf,
    _handle: LoggerHandle,
}

/// Errors from logger installation.
#[derive(Debug)]
pub enum LoggingError {
    InvalidLevel(String),
    RelativeDir(PathBuf),
    CreateDir { dir: PathBuf, source: std::io::Error },
    Backend(flexi_logger::FlexiLoggerError),
    /// A logger with other settings already runs in this process.
    AlreadyActive { level: LevelFilter, dir: PathBuf },
}

impl Display for LoggingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidLevel(message) => write!(f, "{message}"),
            Self::RelativeDir(dir) => {
                write!(f, "log dir must be an absolute path, got `{}`", dir.display())
            }
            Self::CreateDir { dir, source } => {
                write!(f, "cannot create log dir `{}`: {source}", dir.display())
            }
            Self::Backend(err) => write!(f, "cannot start file logger: {err}"),
            Self::AlreadyActive { level, dir } => write!(
                f,
                "file logging already active at `{}` with level {level}",
                dir.display()
            ),
        }
    }
}

impl Error for LoggingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::CreateDir { source, .. } => Some(source),
            Self::Backend(err) => Some(err),
            _ => None,
        }
    }
}

/// Starts file logging for `config`.
///
/// Returns `Ok(false)` when no `dir` is configured, `Ok(true)` once a logger
/// with exactly these settings is running.
pub fn init_logging_from_config(config: &LoggingConfig) -> Result<bool, LoggingError> {
    let Some(dir) = config.dir.as_deref() else {
        return Ok(false);
    };
    if !dir.is_absolute() {
        return Err(LoggingError::RelativeDir(dir.to_path_buf()));
    }
    let level = match config.level.as_deref() {
        Some(text) => parse_level(text).map_err(LoggingError::InvalidLevel)?,
        None if cfg!(debug_assertions) => LevelFilter::Debug,
        None => LevelFilter::Info,
    };

    let active = ACTIVE_LOGGER.get_or_try_init(|| start_file_logger(level, dir))?;
    if active.level != level || active.dir != dir {
        return Err(LoggingError::AlreadyActive {
            level: active.level,
            dir: active.dir.clone(),
        });
    }
    Ok(true)
}

fn start_file_logger(level: LevelFilter, dir: &Path) -> Result<ActiveLogger, LoggingError> {
    std::fs::create_dir_all(dir).map_err(|source| LoggingError::CreateDir {
        dir: dir.to_path_buf(),
        source,
    })?;

    let handle = Logger::with(LogSpecification::builder().default(level).build())
        .log_to_file(FileSpec::default().directory(dir).basename(LOG_FILE_BASENAME))
        .rotate(
            Criterion::Size(ROTATE_AT_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(KEEP_ROTATED_FILES),
        )
        .write_mode(WriteMode::BufferAndFlush)
        .append()
        .format_for_files(flexi_logger::detailed_format)
        .start()
        .map_err(LoggingError::Backend)?;

    info!(
        "event=core_init module=core status=ok version={} level={level} log_dir={}",
        env!("CARGO_PKG_VERSION"),
        dir.display()
    );
    Ok(ActiveLogger {
        level,
        dir: dir.to_path_buf(),
        _handle: handle,
    })
}

/// Parses a config level name; `warning` is accepted for `warn`.
pub(crate) fn parse_level(text: &str) -> Result<LevelFilter, String> {
    match text.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok(LevelFilter::Trace),
        "debug" => Ok(LevelFilter::Debug),
        "info" => Ok(LevelFilter::Info),
        "warn" | "warning" => Ok(LevelFilter::Warn),
        "error" => Ok(LevelFilter::Error),
        other => Err(format!(
            "unsupported log level `{other}`; expected trace|debug|info|warn|error"
        )),
    }
}
