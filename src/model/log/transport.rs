use macros::loggable;

loggable! {
    TransportLog {
        #[error("Shipping {file} to {kind} destination {destination}")]
        Shipping { kind: String, file: String, destination: String } => tracing::Level::INFO,

        #[error("Dropbox upload session {session} committed at offset {offset}")]
        DropboxSessionFinished { session: String, offset: u64 } => tracing::Level::DEBUG,

        #[error("Created Google Drive folder {name}")]
        DriveFolderCreated { name: String } => tracing::Level::INFO,

        #[error("SMB upload verification was inconclusive for {file}")]
        SmbVerificationInconclusive { file: String } => tracing::Level::WARN,
    }
}
