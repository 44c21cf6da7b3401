use macros::traceable;

traceable! {
    TokenRefreshError {
        #[no_source]
        #[error("Cannot refresh access token, missing {field}")]
        MissingField { field: String } => tracing::Level::ERROR,

        #[error("Token refresh request failed: {err}")]
        RequestFailed => tracing::Level::ERROR,

        #[no_source]
        #[error("Token refresh rejected with status {status}: {body}")]
        Rejected { status: u16, body: String } => tracing::Level::ERROR,

        #[error("Token refresh response is malformed: {err}")]
        InvalidResponse => tracing::Level::ERROR,

        #[no_source]
        #[error("Target kind {kind} has no token endpoint")]
        UnsupportedProvider { kind: String } => tracing::Level::ERROR,
    }
}
