use crate::model::error::Error;
use crate::model::error::system::SystemError;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

pub struct Logging;

impl Logging {
    /// Installs the global subscriber. Keep the returned guard alive for the
    /// lifetime of the process or buffered file output is lost.
    pub fn initialize(log_directory: &Path) -> Result<WorkerGuard, Error> {
        std::fs::create_dir_all(log_directory).map_err(SystemError::LoggingInitFailed)?;
        let file_appender = tracing_appender::rolling::daily(log_directory, "backup-relay.log");
        let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false))
            .with(fmt::layer().with_ansi(false).with_writer(file_writer))
            .try_init()
            .map_err(SystemError::LoggingInitFailed)?;

        log_panics::init();
        Ok(guard)
    }
}
