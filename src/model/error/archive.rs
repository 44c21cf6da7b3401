use macros::traceable;
use std::path::PathBuf;

traceable! {
    ArchiveError {
        #[no_source]
        #[error("Archive source is not a directory: {path:?}")]
        NotADirectory { path: PathBuf } => tracing::Level::ERROR,

        #[error("Failed to read archive source {path:?}: {err}")]
        ReadSourceFailed { path: PathBuf } => tracing::Level::ERROR,

        #[error("Failed to write archive {path:?}: {err}")]
        WriteArchiveFailed { path: PathBuf } => tracing::Level::ERROR,

        #[error("Compression worker stopped unexpectedly: {err}")]
        CompressionAborted => tracing::Level::ERROR,

        #[error("Failed to remove archive {path:?}: {err}")]
        RemoveArchiveFailed { path: PathBuf } => tracing::Level::WARN,
    }
}
