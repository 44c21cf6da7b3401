use macros::traceable;

traceable! {
    SystemError {
        #[error("Configuration not found: {err}")]
        ConfigNotFound => tracing::Level::ERROR,

        #[error("Invalid configuration: {err}")]
        InvalidConfig => tracing::Level::ERROR,

        #[error("Failed to initialize logging: {err}")]
        LoggingInitFailed => tracing::Level::ERROR,

        #[error("Failed to build HTTP client: {err}")]
        HttpClientFailed => tracing::Level::ERROR,

        #[error("Failed to listen for shutdown signal: {err}")]
        SignalListenFailed => tracing::Level::ERROR,

        #[no_source]
        #[error("Failed to deliver shutdown signal")]
        ShutdownSignalFailed => tracing::Level::WARN,

        #[error("Worker thread panicked: {err}")]
        ThreadPanic => tracing::Level::ERROR,
    }
}
