use macros::traceable;

traceable! {
    TransportError {
        #[error("Authentication failed: {err}")]
        Auth => tracing::Level::ERROR,

        #[error("Connection failed: {err}")]
        Connect => tracing::Level::ERROR,

        #[error("Remote filesystem error: {err}")]
        RemoteFs => tracing::Level::ERROR,

        #[error("Protocol error: {err}")]
        Protocol => tracing::Level::ERROR,

        #[error("Unsupported: {err}")]
        Unsupported => tracing::Level::ERROR,
    }
}
