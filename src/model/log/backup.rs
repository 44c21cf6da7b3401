use macros::loggable;
use uuid::Uuid;

loggable! {
    BackupLog {
        #[error("Backup {uuid} created for {path}")]
        Created { uuid: Uuid, path: String } => tracing::Level::INFO,

        #[error("Backup {uuid} started")]
        Started { uuid: Uuid } => tracing::Level::INFO,

        #[error("Backup {uuid} archived {size} bytes")]
        Archived { uuid: Uuid, size: u64 } => tracing::Level::INFO,

        #[error("Backup {uuid} refreshed target credentials")]
        CredentialsRefreshed { uuid: Uuid } => tracing::Level::INFO,

        #[error("Backup {uuid} completed with {size} bytes")]
        Completed { uuid: Uuid, size: u64 } => tracing::Level::INFO,

        #[error("Backup {uuid} failed: {reason}")]
        Failed { uuid: Uuid, reason: String } => tracing::Level::ERROR,
    }
}
