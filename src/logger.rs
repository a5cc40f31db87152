use log::LevelFilter;
use log4rs::Handle;
use log4rs::append::console::ConsoleAppender;
use log4rs::append::file::FileAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;
use once_cell::sync::OnceCell;
use std::path::Path;

use crate::errors::DbError;

static HANDLE: OnceCell<Handle> = OnceCell::new();

const PATTERN: &str = "{d(%Y-%m-%dT%H:%M:%S%.3f)} {l} {t} - {m}{n}";

fn build_config(level: LevelFilter, log_file: Option<&Path>) -> Result<Config, DbError> {
    let stderr = ConsoleAppender::builder()
        .target(log4rs::append::console::Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(PATTERN)))
        .build();
    let mut builder =
        Config::builder().appender(Appender::builder().build("stderr", Box::new(stderr)));
    let mut root = Root::builder().appender("stderr");
    if let Some(path) = log_file {
        let file = FileAppender::builder()
            .encoder(Box::new(PatternEncoder::new(PATTERN)))
            .build(path)
            .map_err(|e| DbError::Config(format!("log file: {e}")))?;
        builder = builder.appender(Appender::builder().build("file", Box::new(file)));
        root = root.appender("file");
    }
    builder.build(root.build(level)).map_err(|e| DbError::Config(e.to_string()))
}

/// Initialize logging to stderr. Safe to call more than once; later
/// calls reconfigure the existing logger.
pub fn init(level: LevelFilter) -> Result<(), DbError> {
    apply(build_config(level, None)?)
}

/// Initialize logging with an additional per-database log file inside
/// the data directory.
pub fn init_for_db(data_dir: &Path, level: LevelFilter) -> Result<(), DbError> {
    let log_path = data_dir.join("folio.log");
    apply(build_config(level, Some(&log_path))?)
}

fn apply(config: Config) -> Result<(), DbError> {
    if let Some(handle) = HANDLE.get() {
        handle.set_config(config);
        return Ok(());
    }
    match log4rs::init_config(config) {
        Ok(handle) => {
            let _ = HANDLE.set(handle);
            Ok(())
        }
        // Another logger won the race; nothing to reconfigure.
        Err(e) => {
            log::debug!("logger already initialized: {e}");
            Ok(())
        }
    }
}
