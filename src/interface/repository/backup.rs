use crate::core::infrastructure::database_manager::{
    DatabaseManager, column, optional_uuid_column, uuid_column,
};
use crate::model::backup::{BackupRecord, BackupStatus};
use crate::model::error::Error;
use crate::model::error::database::DatabaseError;
use crate::model::error::misc::MiscError;
use crate::model::error::task::TaskError;
use sqlx::sqlite::SqliteRow;
use std::path::PathBuf;
use uuid::Uuid;

pub trait BackupRepository {
    async fn create_backup(&self, backup: &BackupRecord) -> Result<(), Error>;
    async fn modify_backup(&self, backup: &BackupRecord) -> Result<(), Error>;
    async fn get_backup(&self, uuid: Uuid) -> Result<Option<BackupRecord>, Error>;
    async fn get_backups_by_schedule(&self, schedule_uuid: Uuid) -> Result<Vec<BackupRecord>, Error>;
}

const SELECT_BACKUPS: &str = r#"
    SELECT
        uuid,
        source_path,
        status,
        size,
        error_message,
        created_at,
        completed_at,
        schedule_uuid,
        target_uuid
    FROM Backups
"#;

impl BackupRepository for DatabaseManager {
    async fn create_backup(&self, backup: &BackupRecord) -> Result<(), Error> {
        let pool = self.get_pool();
        sqlx::query(
            r#"
            INSERT INTO Backups (
                uuid,
                source_path,
                status,
                size,
                error_message,
                created_at,
                completed_at,
                schedule_uuid,
                target_uuid
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(backup.uuid.as_bytes().as_slice())
        .bind(backup.source_path.to_string_lossy().to_string())
        .bind(serde_json::to_string(&backup.status).map_err(MiscError::SerializeError)?)
        .bind(backup.size as i64)
        .bind(&backup.error_message)
        .bind(backup.created_at)
        .bind(backup.completed_at)
        .bind(backup.schedule_uuid.map(|uuid| uuid.as_bytes().to_vec()))
        .bind(backup.target_uuid.as_bytes().as_slice())
        .execute(&pool)
        .await
        .map_err(DatabaseError::StatementExecutionFailed)?;
        Ok(())
    }

    // Rows that already reached a terminal status are never rewritten.
    async fn modify_backup(&self, backup: &BackupRecord) -> Result<(), Error> {
        let pool = self.get_pool();
        let completed =
            serde_json::to_string(&BackupStatus::Completed).map_err(MiscError::SerializeError)?;
        let failed =
            serde_json::to_string(&BackupStatus::Failed).map_err(MiscError::SerializeError)?;
        let result = sqlx::query(
            r#"
            UPDATE Backups
            SET
                status = ?,
                size = ?,
                error_message = ?,
                completed_at = ?
            WHERE uuid = ? AND status NOT IN (?, ?)
            "#,
        )
        .bind(serde_json::to_string(&backup.status).map_err(MiscError::SerializeError)?)
        .bind(backup.size as i64)
        .bind(&backup.error_message)
        .bind(backup.completed_at)
        .bind(backup.uuid.as_bytes().as_slice())
        .bind(completed)
        .bind(failed)
        .execute(&pool)
        .await
        .map_err(DatabaseError::StatementExecutionFailed)?;

        if result.rows_affected() == 0 {
            let error = match self.get_backup(backup.uuid).await? {
                Some(stored) => {
                    TaskError::IllegalTransition(stored.status.as_str(), backup.status.as_str())
                }
                None => TaskError::BackupNotFound(backup.uuid),
            };
            return Err(error.into());
        }
        Ok(())
    }

    async fn get_backup(&self, uuid: Uuid) -> Result<Option<BackupRecord>, Error> {
        let pool = self.get_pool();
        let row = sqlx::query(&format!("{SELECT_BACKUPS} WHERE uuid = ?"))
            .bind(uuid.as_bytes().as_slice())
            .fetch_optional(&pool)
            .await
            .map_err(DatabaseError::StatementExecutionFailed)?;
        row.as_ref().map(backup_from_row).transpose()
    }

    async fn get_backups_by_schedule(&self, schedule_uuid: Uuid) -> Result<Vec<BackupRecord>, Error> {
        let pool = self.get_pool();
        let rows = sqlx::query(&format!(
            "{SELECT_BACKUPS} WHERE schedule_uuid = ? ORDER BY created_at"
        ))
        .bind(schedule_uuid.as_bytes().as_slice())
        .fetch_all(&pool)
        .await
        .map_err(DatabaseError::StatementExecutionFailed)?;
        rows.iter().map(backup_from_row).collect()
    }
}

fn backup_from_row(row: &SqliteRow) -> Result<BackupRecord, Error> {
    let status_str: String = column(row, "status")?;
    let status = serde_json::from_str(&status_str).map_err(MiscError::DeserializeError)?;
    let size: i64 = column(row, "size")?;

    Ok(BackupRecord {
        uuid: uuid_column(row, "uuid")?,
        source_path: PathBuf::from(column::<String>(row, "source_path")?),
        status,
        size: size.max(0) as u64,
        error_message: column(row, "error_message")?,
        created_at: column(row, "created_at")?,
        completed_at: column(row, "completed_at")?,
        schedule_uuid: optional_uuid_column(row, "schedule_uuid")?,
        target_uuid: uuid_column(row, "target_uuid")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::repository::schedule::ScheduleRepository;
    use crate::interface::repository::target::TargetRepository;
    use crate::model::schedule::ScheduleDefinition;
    use crate::model::target::{Credentials, TargetDefinition, TargetKind};
    use chrono::Utc;

    async fn seeded() -> (DatabaseManager, TargetDefinition, ScheduleDefinition) {
        let database = DatabaseManager::in_memory().await.unwrap();
        let target = TargetDefinition::new(
            "disk",
            TargetKind::Local,
            "/mnt/backups",
            Credentials::default(),
            Utc::now(),
        );
        database.create_target(&target).await.unwrap();
        let schedule = ScheduleDefinition::new(
            "nightly",
            "/srv/data",
            vec![1, 2, 3],
            "03:00",
            target.uuid,
            Utc::now(),
        );
        database.create_schedule(&schedule).await.unwrap();
        (database, target, schedule)
    }

    #[tokio::test]
    async fn stored_record_reads_back() {
        let (database, target, schedule) = seeded().await;
        let mut backup =
            BackupRecord::new(schedule.source_path.clone(), Some(schedule.uuid), target.uuid, Utc::now());
        database.create_backup(&backup).await.unwrap();

        backup.start().unwrap();
        backup.record_size(4096).unwrap();
        database.modify_backup(&backup).await.unwrap();

        let stored = database.get_backup(backup.uuid).await.unwrap().unwrap();
        assert_eq!(stored.status, BackupStatus::InProgress);
        assert_eq!(stored.size, 4096);
        assert_eq!(stored.schedule_uuid, Some(schedule.uuid));
        assert_eq!(stored.target_uuid, target.uuid);
    }

    #[tokio::test]
    async fn terminal_rows_are_not_overwritten() {
        let (database, target, _) = seeded().await;
        let mut backup = BackupRecord::new(PathBuf::from("/tmp/a"), None, target.uuid, Utc::now());
        database.create_backup(&backup).await.unwrap();
        backup.start().unwrap();
        backup.fail("permission denied", Utc::now()).unwrap();
        database.modify_backup(&backup).await.unwrap();

        let mut stale = backup.clone();
        stale.status = BackupStatus::Completed;
        stale.error_message = None;
        let result = database.modify_backup(&stale).await;
        assert!(matches!(
            result,
            Err(Error::Task(TaskError::IllegalTransition { .. }))
        ));

        let stored = database.get_backup(backup.uuid).await.unwrap().unwrap();
        assert_eq!(stored.status, BackupStatus::Failed);
        assert_eq!(stored.error_message.as_deref(), Some("permission denied"));
    }

    #[tokio::test]
    async fn removing_schedule_cascades_to_records() {
        let (database, target, schedule) = seeded().await;
        let scheduled =
            BackupRecord::new(schedule.source_path.clone(), Some(schedule.uuid), target.uuid, Utc::now());
        let manual = BackupRecord::new(PathBuf::from("/tmp/b"), None, target.uuid, Utc::now());
        database.create_backup(&scheduled).await.unwrap();
        database.create_backup(&manual).await.unwrap();

        database.remove_schedule(schedule.uuid).await.unwrap();

        assert!(database.get_backup(scheduled.uuid).await.unwrap().is_none());
        assert!(database.get_backup(manual.uuid).await.unwrap().is_some());
        assert!(database.get_schedule(schedule.uuid).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn active_schedules_exclude_deactivated() {
        let (database, target, mut schedule) = seeded().await;
        let other = ScheduleDefinition::new("weekly", "/srv/other", vec![0], "12:00", target.uuid, Utc::now());
        database.create_schedule(&other).await.unwrap();

        schedule.is_active = false;
        database.modify_schedule(&schedule).await.unwrap();

        let active = database.get_active_schedules().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].uuid, other.uuid);
        assert_eq!(active[0].days_of_week(), &[0]);
        assert_eq!(database.get_all_schedules().await.unwrap().len(), 2);
    }
}
