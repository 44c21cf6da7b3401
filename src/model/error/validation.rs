use macros::traceable;

traceable! {
    ValidationError {
        #[no_source]
        #[error("Target {target} is missing required credential field {field}")]
        MissingCredential { target: String, field: String } => tracing::Level::ERROR,
    }
}
