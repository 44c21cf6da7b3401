use crate::core::backup::archiver::Archiver;
use crate::core::backup::credential_refresher::CredentialRefresher;
use crate::core::infrastructure::database_manager::DatabaseManager;
use crate::core::transport::TransportRegistry;
use crate::interface::clock::Clock;
use crate::interface::repository::backup::BackupRepository;
use crate::interface::repository::schedule::ScheduleRepository;
use crate::interface::repository::target::TargetRepository;
use crate::interface::transport::ShipResult;
use crate::model::backup::BackupRecord;
use crate::model::error::Error;
use crate::model::error::archive::ArchiveError;
use crate::model::error::task::TaskError;
use crate::model::log::backup::BackupLog;
use crate::model::log::transport::TransportLog;
use crate::model::target::{TargetDefinition, TargetKind};
use crate::utils::temp_artifact::TempArtifact;
use macros::log;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use uuid::Uuid;

pub struct BackupOrchestrator {
    database_manager: Arc<DatabaseManager>,
    archiver: Arc<Archiver>,
    refresher: Arc<CredentialRefresher>,
    transports: Arc<TransportRegistry>,
    clock: Arc<dyn Clock>,
}

impl BackupOrchestrator {
    pub fn new(
        database_manager: Arc<DatabaseManager>,
        archiver: Arc<Archiver>,
        refresher: Arc<CredentialRefresher>,
        transports: Arc<TransportRegistry>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            database_manager,
            archiver,
            refresher,
            transports,
            clock,
        }
    }

    /// Persists a pending record for the schedule, snapshotting its source path.
    pub async fn create_backup(&self, schedule_uuid: Uuid) -> Result<BackupRecord, Error> {
        let schedule = self
            .database_manager
            .get_schedule(schedule_uuid)
            .await?
            .ok_or_else(|| TaskError::ScheduleNotFound(schedule_uuid))?;
        let record = BackupRecord::new(
            schedule.source_path.clone(),
            Some(schedule.uuid),
            schedule.target_uuid,
            self.clock.now(),
        );
        self.insert(record).await
    }

    pub async fn create_manual_backup(
        &self,
        source_path: impl Into<PathBuf>,
        target_uuid: Uuid,
    ) -> Result<BackupRecord, Error> {
        if self.database_manager.get_target(target_uuid).await?.is_none() {
            Err(TaskError::TargetNotFound(target_uuid))?
        }
        let record = BackupRecord::new(source_path.into(), None, target_uuid, self.clock.now());
        self.insert(record).await
    }

    /// Runs an existing pending record to completion; failures are recorded
    /// on the record and then returned to the caller.
    pub async fn perform_manual_backup(&self, backup_uuid: Uuid) -> Result<BackupRecord, Error> {
        let record = self
            .database_manager
            .get_backup(backup_uuid)
            .await?
            .ok_or_else(|| TaskError::BackupNotFound(backup_uuid))?;
        self.execute(record).await
    }

    /// Trigger path: failures end up on the record and in the log only.
    pub async fn run_scheduled(&self, schedule_uuid: Uuid) {
        let record = match self.create_backup(schedule_uuid).await {
            Ok(record) => record,
            Err(err) => {
                log!(err);
                return;
            }
        };
        if let Err(err) = self.execute(record).await {
            log!(err, "scheduled backup failed");
        }
    }

    pub async fn execute(&self, mut record: BackupRecord) -> Result<BackupRecord, Error> {
        record.start()?;
        self.database_manager.modify_backup(&record).await?;
        log!(BackupLog::Started { uuid: record.uuid });

        match self.dispatch(&mut record).await {
            Ok(result) => {
                record.complete(result.remote_size, self.clock.now())?;
                self.database_manager.modify_backup(&record).await?;
                log!(BackupLog::Completed {
                    uuid: record.uuid,
                    size: record.size,
                });
                Ok(record)
            }
            Err(err) => {
                let reason = err.to_string();
                record.fail(reason.clone(), self.clock.now())?;
                if let Err(persist) = self.database_manager.modify_backup(&record).await {
                    log!(persist);
                }
                log!(BackupLog::Failed {
                    uuid: record.uuid,
                    reason,
                });
                Err(err)
            }
        }
    }

    async fn insert(&self, record: BackupRecord) -> Result<BackupRecord, Error> {
        self.database_manager.create_backup(&record).await?;
        log!(BackupLog::Created {
            uuid: record.uuid,
            path: record.source_path.display().to_string(),
        });
        Ok(record)
    }

    async fn dispatch(&self, record: &mut BackupRecord) -> Result<ShipResult, Error> {
        let mut target = self
            .database_manager
            .get_target(record.target_uuid)
            .await?
            .ok_or_else(|| TaskError::TargetNotFound(record.target_uuid))?;
        target.validate()?;
        let transport = self.transports.get(target.kind)?;

        let source = record.source_path.clone();
        let metadata = fs::metadata(&source)
            .await
            .map_err(|err| TaskError::SourceUnavailable(source.display().to_string(), err))?;

        // The archive is removed when `_artifact` drops, on every exit path.
        let (upload, _artifact): (PathBuf, Option<TempArtifact>) = if metadata.is_dir() {
            let archive = self.archiver.compress(&source).await?;
            let size = Self::artifact_size(archive.path()).await?;
            record.record_size(size)?;
            self.database_manager.modify_backup(record).await?;
            log!(BackupLog::Archived {
                uuid: record.uuid,
                size,
            });
            (archive.path().to_path_buf(), Some(archive))
        } else {
            record.record_size(metadata.len())?;
            (source, None)
        };

        if Self::needs_refresh(&target) {
            let outcome = self
                .refresher
                .ensure_fresh(target.kind, &target.credentials)
                .await?;
            if outcome.refreshed {
                target.credentials = outcome.credentials;
                target.updated_at = self.clock.now();
                self.database_manager.modify_target(&target).await?;
                log!(BackupLog::CredentialsRefreshed { uuid: record.uuid });
            }
        }

        log!(TransportLog::Shipping {
            kind: target.kind.as_str().to_string(),
            file: upload.display().to_string(),
            destination: target.destination.clone(),
        });
        Ok(transport.ship(&upload, &target).await?)
    }

    fn needs_refresh(target: &TargetDefinition) -> bool {
        match target.kind {
            TargetKind::GoogleDrive => true,
            TargetKind::Dropbox => target.credentials.refresh_token.is_some(),
            _ => false,
        }
    }

    async fn artifact_size(path: &Path) -> Result<u64, ArchiveError> {
        fs::metadata(path)
            .await
            .map(|metadata| metadata.len())
            .map_err(|err| ArchiveError::WriteArchiveFailed(path, err))
    }
}
