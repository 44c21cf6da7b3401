use macros::traceable;
use uuid::Uuid;

traceable! {
    TaskError {
        #[no_source]
        #[error("Schedule not found: {uuid}")]
        ScheduleNotFound { uuid: Uuid } => tracing::Level::ERROR,

        #[no_source]
        #[error("Target not found: {uuid}")]
        TargetNotFound { uuid: Uuid } => tracing::Level::ERROR,

        #[no_source]
        #[error("Backup not found: {uuid}")]
        BackupNotFound { uuid: Uuid } => tracing::Level::ERROR,

        #[no_source]
        #[error("Illegal backup transition from {from} to {to}")]
        IllegalTransition { from: String, to: String } => tracing::Level::ERROR,

        #[error("Invalid recurrence: {err}")]
        InvalidRecurrence => tracing::Level::ERROR,

        #[error("Backup source is unavailable {path}: {err}")]
        SourceUnavailable { path: String } => tracing::Level::ERROR,
    }
}
