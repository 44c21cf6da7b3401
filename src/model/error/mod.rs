pub mod archive;
pub mod database;
pub mod misc;
pub mod system;
pub mod task;
pub mod token;
pub mod transport;
pub mod validation;

use crate::model::error::archive::ArchiveError;
use crate::model::error::database::DatabaseError;
use crate::model::error::misc::MiscError;
use crate::model::error::system::SystemError;
use crate::model::error::task::TaskError;
use crate::model::error::token::TokenRefreshError;
use crate::model::error::transport::TransportError;
use crate::model::error::validation::ValidationError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize, Deserialize)]
pub enum Error {
    #[error(transparent)]
    Archive(ArchiveError),
    #[error(transparent)]
    Database(DatabaseError),
    #[error(transparent)]
    Misc(MiscError),
    #[error(transparent)]
    System(SystemError),
    #[error(transparent)]
    Task(TaskError),
    #[error(transparent)]
    TokenRefresh(TokenRefreshError),
    #[error(transparent)]
    Transport(TransportError),
    #[error(transparent)]
    Validation(ValidationError),
}

impl Error {
    pub fn level(&self) -> tracing::Level {
        match self {
            Error::Archive(err) => err.level(),
            Error::Database(err) => err.level(),
            Error::Misc(err) => err.level(),
            Error::System(err) => err.level(),
            Error::Task(err) => err.level(),
            Error::TokenRefresh(err) => err.level(),
            Error::Transport(err) => err.level(),
            Error::Validation(err) => err.level(),
        }
    }
}

impl From<ArchiveError> for Error {
    fn from(error: ArchiveError) -> Self {
        Self::Archive(error)
    }
}

impl From<DatabaseError> for Error {
    fn from(error: DatabaseError) -> Self {
        Self::Database(error)
    }
}

impl From<MiscError> for Error {
    fn from(error: MiscError) -> Self {
        Self::Misc(error)
    }
}

impl From<SystemError> for Error {
    fn from(error: SystemError) -> Self {
        Self::System(error)
    }
}

impl From<TaskError> for Error {
    fn from(error: TaskError) -> Self {
        Self::Task(error)
    }
}

impl From<TokenRefreshError> for Error {
    fn from(error: TokenRefreshError) -> Self {
        Self::TokenRefresh(error)
    }
}

impl From<TransportError> for Error {
    fn from(error: TransportError) -> Self {
        Self::Transport(error)
    }
}

impl From<ValidationError> for Error {
    fn from(error: ValidationError) -> Self {
        Self::Validation(error)
    }
}
