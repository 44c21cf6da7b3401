use macros::traceable;

traceable! {
    DatabaseError {
        #[error("Failed to connect to database: {err}")]
        DatabaseConnectFailed => tracing::Level::ERROR,

        #[error("Failed to execute SQL statement: {err}")]
        StatementExecutionFailed => tracing::Level::ERROR,

        #[no_source]
        #[error("Stored data is corrupted")]
        DataCorrupted => tracing::Level::ERROR,
    }
}
