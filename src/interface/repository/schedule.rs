use crate::core::infrastructure::database_manager::{DatabaseManager, column, uuid_column};
use crate::model::error::Error;
use crate::model::error::database::DatabaseError;
use crate::model::error::misc::MiscError;
use crate::model::schedule::ScheduleDefinition;
use sqlx::sqlite::SqliteRow;
use std::path::PathBuf;
use uuid::Uuid;

pub trait ScheduleRepository {
    async fn create_schedule(&self, schedule: &ScheduleDefinition) -> Result<(), Error>;
    async fn modify_schedule(&self, schedule: &ScheduleDefinition) -> Result<(), Error>;
    async fn remove_schedule(&self, uuid: Uuid) -> Result<(), Error>;
    async fn get_schedule(&self, uuid: Uuid) -> Result<Option<ScheduleDefinition>, Error>;
    async fn get_all_schedules(&self) -> Result<Vec<ScheduleDefinition>, Error>;
    async fn get_active_schedules(&self) -> Result<Vec<ScheduleDefinition>, Error>;
}

const SELECT_SCHEDULES: &str = r#"
    SELECT
        uuid,
        name,
        source_path,
        days_of_week,
        time_of_day,
        is_active,
        target_uuid,
        created_at,
        updated_at
    FROM Schedules
"#;

impl ScheduleRepository for DatabaseManager {
    async fn create_schedule(&self, schedule: &ScheduleDefinition) -> Result<(), Error> {
        let pool = self.get_pool();
        sqlx::query(
            r#"
            INSERT INTO Schedules (
                uuid,
                name,
                source_path,
                days_of_week,
                time_of_day,
                is_active,
                target_uuid,
                created_at,
                updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(schedule.uuid.as_bytes().as_slice())
        .bind(&schedule.name)
        .bind(schedule.source_path.to_string_lossy().to_string())
        .bind(
            serde_json::to_string(schedule.days_of_week()).map_err(MiscError::SerializeError)?,
        )
        .bind(schedule.time_of_day())
        .bind(schedule.is_active)
        .bind(schedule.target_uuid.as_bytes().as_slice())
        .bind(schedule.created_at)
        .bind(schedule.updated_at)
        .execute(&pool)
        .await
        .map_err(DatabaseError::StatementExecutionFailed)?;
        Ok(())
    }

    async fn modify_schedule(&self, schedule: &ScheduleDefinition) -> Result<(), Error> {
        let pool = self.get_pool();
        sqlx::query(
            r#"
            UPDATE Schedules
            SET
                name = ?,
                source_path = ?,
                days_of_week = ?,
                time_of_day = ?,
                is_active = ?,
                target_uuid = ?,
                updated_at = ?
            WHERE uuid = ?
            "#,
        )
        .bind(&schedule.name)
        .bind(schedule.source_path.to_string_lossy().to_string())
        .bind(
            serde_json::to_string(schedule.days_of_week()).map_err(MiscError::SerializeError)?,
        )
        .bind(schedule.time_of_day())
        .bind(schedule.is_active)
        .bind(schedule.target_uuid.as_bytes().as_slice())
        .bind(schedule.updated_at)
        .bind(schedule.uuid.as_bytes().as_slice())
        .execute(&pool)
        .await
        .map_err(DatabaseError::StatementExecutionFailed)?;
        Ok(())
    }

    async fn remove_schedule(&self, uuid: Uuid) -> Result<(), Error> {
        let pool = self.get_pool();
        sqlx::query("DELETE FROM Schedules WHERE uuid = ?")
            .bind(uuid.as_bytes().as_slice())
            .execute(&pool)
            .await
            .map_err(DatabaseError::StatementExecutionFailed)?;
        Ok(())
    }

    async fn get_schedule(&self, uuid: Uuid) -> Result<Option<ScheduleDefinition>, Error> {
        let pool = self.get_pool();
        let row = sqlx::query(&format!("{SELECT_SCHEDULES} WHERE uuid = ?"))
            .bind(uuid.as_bytes().as_slice())
            .fetch_optional(&pool)
            .await
            .map_err(DatabaseError::StatementExecutionFailed)?;
        row.as_ref().map(schedule_from_row).transpose()
    }

    async fn get_all_schedules(&self) -> Result<Vec<ScheduleDefinition>, Error> {
        let pool = self.get_pool();
        let rows = sqlx::query(&format!("{SELECT_SCHEDULES} ORDER BY created_at"))
            .fetch_all(&pool)
            .await
            .map_err(DatabaseError::StatementExecutionFailed)?;
        rows.iter().map(schedule_from_row).collect()
    }

    async fn get_active_schedules(&self) -> Result<Vec<ScheduleDefinition>, Error> {
        let pool = self.get_pool();
        let rows = sqlx::query(&format!(
            "{SELECT_SCHEDULES} WHERE is_active = 1 ORDER BY created_at"
        ))
        .fetch_all(&pool)
        .await
        .map_err(DatabaseError::StatementExecutionFailed)?;
        rows.iter().map(schedule_from_row).collect()
    }
}

fn schedule_from_row(row: &SqliteRow) -> Result<ScheduleDefinition, Error> {
    let days_str: String = column(row, "days_of_week")?;
    let days_of_week: Vec<u8> =
        serde_json::from_str(&days_str).map_err(MiscError::DeserializeError)?;

    Ok(ScheduleDefinition::restore(
        uuid_column(row, "uuid")?,
        column(row, "name")?,
        PathBuf::from(column::<String>(row, "source_path")?),
        days_of_week,
        column(row, "time_of_day")?,
        column(row, "is_active")?,
        uuid_column(row, "target_uuid")?,
        column(row, "created_at")?,
        column(row, "updated_at")?,
    ))
}
