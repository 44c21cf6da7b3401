use crate::interface::clock::Clock;
use crate::model::error::archive::ArchiveError;
use crate::utils::temp_artifact::TempArtifact;
use flate2::Compression;
use flate2::write::GzEncoder;
use std::collections::VecDeque;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReadDirStream;
use uuid::Uuid;

pub struct Archiver {
    work_directory: PathBuf,
    clock: Arc<dyn Clock>,
}

impl Archiver {
    pub fn new(work_directory: PathBuf, clock: Arc<dyn Clock>) -> Self {
        Self {
            work_directory,
            clock,
        }
    }

    pub fn archive_name(&self, base_name: &str) -> String {
        format!("{}_{}.tar.gz", base_name, self.clock.now_millis())
    }

    /// Packs `source` into `<name>_<millis>.tar.gz` inside a fresh directory
    /// under the work directory, so concurrent runs never share a file.
    /// The archive's top-level entry is the directory itself.
    pub async fn compress(&self, source: &Path) -> Result<TempArtifact, ArchiveError> {
        let source = fs::canonicalize(source)
            .await
            .map_err(|err| ArchiveError::ReadSourceFailed(source, err))?;
        let metadata = fs::metadata(&source)
            .await
            .map_err(|err| ArchiveError::ReadSourceFailed(&source, err))?;
        if !metadata.is_dir() {
            return Err(ArchiveError::NotADirectory(source));
        }
        let base_name = source
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| "root".to_string());

        let entries = Self::collect_entries(&source).await?;

        fs::create_dir_all(&self.work_directory)
            .await
            .map_err(|err| ArchiveError::WriteArchiveFailed(&self.work_directory, err))?;
        let scope = self.work_directory.join(Uuid::new_v4().to_string());
        fs::create_dir(&scope)
            .await
            .map_err(|err| ArchiveError::WriteArchiveFailed(&scope, err))?;
        let artifact = TempArtifact::in_directory(scope, &self.archive_name(&base_name));
        let archive_path = artifact.path().to_path_buf();

        tokio::task::spawn_blocking(move || {
            Self::write_archive(&archive_path, &source, &base_name, &entries)
        })
        .await
        .map_err(ArchiveError::CompressionAborted)??;

        Ok(artifact)
    }

    // Sorted breadth-first walk so identical trees produce identical archives.
    async fn collect_entries(root: &Path) -> Result<Vec<PathBuf>, ArchiveError> {
        let mut entries = Vec::new();
        let mut pending = VecDeque::from([PathBuf::new()]);
        while let Some(relative) = pending.pop_front() {
            let directory = root.join(&relative);
            let reader = fs::read_dir(&directory)
                .await
                .map_err(|err| ArchiveError::ReadSourceFailed(&directory, err))?;
            let mut stream = ReadDirStream::new(reader);
            let mut children = Vec::new();
            while let Some(entry) = stream.next().await {
                let entry = entry.map_err(|err| ArchiveError::ReadSourceFailed(&directory, err))?;
                let file_type = entry
                    .file_type()
                    .await
                    .map_err(|err| ArchiveError::ReadSourceFailed(entry.path(), err))?;
                children.push((relative.join(entry.file_name()), file_type.is_dir()));
            }
            children.sort();
            for (child, is_dir) in children {
                if is_dir {
                    pending.push_back(child.clone());
                }
                entries.push(child);
            }
        }
        Ok(entries)
    }

    fn write_archive(
        archive_path: &Path,
        source: &Path,
        base_name: &str,
        entries: &[PathBuf],
    ) -> Result<(), ArchiveError> {
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(archive_path)
            .map_err(|err| ArchiveError::WriteArchiveFailed(archive_path, err))?;
        let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
        builder.mode(tar::HeaderMode::Deterministic);
        builder.follow_symlinks(false);

        builder
            .append_path_with_name(source, base_name)
            .map_err(|err| ArchiveError::ReadSourceFailed(source, err))?;
        let base = Path::new(base_name);
        for relative in entries {
            let path = source.join(relative);
            builder
                .append_path_with_name(&path, base.join(relative))
                .map_err(|err| ArchiveError::ReadSourceFailed(&path, err))?;
        }

        let encoder = builder
            .into_inner()
            .map_err(|err| ArchiveError::WriteArchiveFailed(archive_path, err))?;
        let file = encoder
            .finish()
            .map_err(|err| ArchiveError::WriteArchiveFailed(archive_path, err))?;
        file.sync_all()
            .map_err(|err| ArchiveError::WriteArchiveFailed(archive_path, err))?;
        Ok(())
    }
}
