use crate::core::backup::archiver::Archiver;
use crate::core::backup::credential_refresher::CredentialRefresher;
use crate::core::backup::orchestrator::BackupOrchestrator;
use crate::core::infrastructure::app_config::AppConfig;
use crate::core::infrastructure::database_manager::DatabaseManager;
use crate::core::schedule::trigger_scheduler::{FireCallback, TriggerScheduler};
use crate::core::transport::TransportRegistry;
use crate::interface::clock::Clock;
use crate::interface::repository::schedule::ScheduleRepository;
use crate::model::backup::BackupRecord;
use crate::model::error::Error;
use crate::model::error::task::TaskError;
use crate::model::recurrence::ScheduleZone;
use crate::model::schedule::ScheduleDefinition;
use chrono::{DateTime, Utc};
use macros::log;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

pub struct Engine {
    database_manager: Arc<DatabaseManager>,
    orchestrator: Arc<BackupOrchestrator>,
    scheduler: TriggerScheduler,
}

impl Engine {
    pub fn new(
        app_config: &AppConfig,
        database_manager: Arc<DatabaseManager>,
        clock: Arc<dyn Clock>,
        client: reqwest::Client,
    ) -> Self {
        let transports = TransportRegistry::default_set(app_config, client.clone());
        Self::with_transports(app_config, database_manager, clock, client, transports)
    }

    pub fn with_transports(
        app_config: &AppConfig,
        database_manager: Arc<DatabaseManager>,
        clock: Arc<dyn Clock>,
        client: reqwest::Client,
        transports: TransportRegistry,
    ) -> Self {
        let archiver = Arc::new(Archiver::new(app_config.archive_directory(), clock.clone()));
        let refresher = Arc::new(CredentialRefresher::new(
            client,
            clock.clone(),
            app_config.token_refresh_margin,
            app_config.google_token_url.clone(),
            app_config.dropbox_token_url.clone(),
        ));
        let orchestrator = Arc::new(BackupOrchestrator::new(
            database_manager.clone(),
            archiver,
            refresher,
            Arc::new(transports),
            clock.clone(),
        ));
        let scheduler = TriggerScheduler::new(
            clock,
            app_config.time_zone,
            Self::fire_callback(orchestrator.clone()),
        );
        Self {
            database_manager,
            orchestrator,
            scheduler,
        }
    }

    // Each firing hands the run to its own task so the timer loop never waits on it.
    fn fire_callback(orchestrator: Arc<BackupOrchestrator>) -> FireCallback {
        Arc::new(move |schedule_uuid: Uuid, _at: DateTime<Utc>| {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move {
                orchestrator.run_scheduled(schedule_uuid).await;
            });
        })
    }

    /// Arms a timer for every active schedule. This is the only start-up side effect.
    pub async fn start(&self) -> Result<usize, Error> {
        let schedules = self.database_manager.get_active_schedules().await?;
        Ok(self.scheduler.load_active(&schedules).await)
    }

    /// Creates a record for the schedule and runs it in the background.
    pub async fn create_backup(&self, schedule_uuid: Uuid) -> Result<BackupRecord, Error> {
        let record = self.orchestrator.create_backup(schedule_uuid).await?;
        let orchestrator = self.orchestrator.clone();
        let pending = record.clone();
        tokio::spawn(async move {
            if let Err(err) = orchestrator.execute(pending).await {
                log!(err, "background backup failed");
            }
        });
        Ok(record)
    }

    pub async fn create_manual_backup(
        &self,
        source_path: impl Into<PathBuf>,
        target_uuid: Uuid,
    ) -> Result<BackupRecord, Error> {
        self.orchestrator
            .create_manual_backup(source_path, target_uuid)
            .await
    }

    pub async fn perform_manual_backup(&self, backup_uuid: Uuid) -> Result<BackupRecord, Error> {
        self.orchestrator.perform_manual_backup(backup_uuid).await
    }

    /// Creates and synchronously runs one backup for a schedule.
    pub async fn run_schedule_now(&self, schedule_uuid: Uuid) -> Result<BackupRecord, Error> {
        let record = self.orchestrator.create_backup(schedule_uuid).await?;
        self.orchestrator.execute(record).await
    }

    pub async fn update_job(&self, schedule: &ScheduleDefinition) -> Result<(), Error> {
        if schedule.is_active {
            self.scheduler.reschedule(schedule).await
        } else {
            self.scheduler.cancel(schedule.uuid).await;
            Ok(())
        }
    }

    pub async fn stop_job(&self, schedule_uuid: Uuid) -> bool {
        self.scheduler.cancel(schedule_uuid).await
    }

    pub async fn remove_schedule(&self, schedule_uuid: Uuid) -> Result<(), Error> {
        self.scheduler.cancel(schedule_uuid).await;
        self.database_manager.remove_schedule(schedule_uuid).await
    }

    pub async fn next_triggers(
        &self,
        schedule_uuid: Uuid,
        count: usize,
    ) -> Result<Vec<DateTime<Utc>>, Error> {
        let schedule = self
            .database_manager
            .get_schedule(schedule_uuid)
            .await?
            .ok_or_else(|| TaskError::ScheduleNotFound(schedule_uuid))?;
        self.scheduler.upcoming(&schedule, count)
    }

    pub fn zone(&self) -> &ScheduleZone {
        self.scheduler.zone()
    }

    pub fn is_armed(&self, schedule_uuid: Uuid) -> bool {
        self.scheduler.registry().contains(schedule_uuid)
    }

    pub async fn shutdown(&self) {
        self.scheduler.shutdown().await;
    }
}
