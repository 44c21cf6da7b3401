use crate::model::error::archive::ArchiveError;
use macros::log;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Temporary file that is removed when the guard is dropped.
///
/// An artifact created with [`TempArtifact::in_directory`] also owns its
/// parent directory and removes it once the file is gone.
#[derive(Debug)]
pub struct TempArtifact {
    path: PathBuf,
    directory: Option<PathBuf>,
}

impl TempArtifact {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            directory: None,
        }
    }

    pub fn in_directory(directory: PathBuf, file_name: &str) -> Self {
        Self {
            path: directory.join(file_name),
            directory: Some(directory),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempArtifact {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => log!(ArchiveError::RemoveArchiveFailed(self.path.clone(), err)),
        }
        if let Some(directory) = self.directory.take() {
            match std::fs::remove_dir(&directory) {
                Ok(()) => {}
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(err) => log!(ArchiveError::RemoveArchiveFailed(directory, err)),
            }
        }
    }
}
