use crate::core::infrastructure::database_manager::{DatabaseManager, column, uuid_column};
use crate::model::error::Error;
use crate::model::error::database::DatabaseError;
use crate::model::error::misc::MiscError;
use crate::model::target::{Credentials, TargetDefinition, TargetKind};
use sqlx::sqlite::SqliteRow;
use uuid::Uuid;

pub trait TargetRepository {
    async fn create_target(&self, target: &TargetDefinition) -> Result<(), Error>;
    async fn modify_target(&self, target: &TargetDefinition) -> Result<(), Error>;
    async fn remove_target(&self, uuid: Uuid) -> Result<(), Error>;
    async fn get_target(&self, uuid: Uuid) -> Result<Option<TargetDefinition>, Error>;
    async fn get_all_targets(&self) -> Result<Vec<TargetDefinition>, Error>;
}

impl TargetRepository for DatabaseManager {
    async fn create_target(&self, target: &TargetDefinition) -> Result<(), Error> {
        let pool = self.get_pool();
        sqlx::query(
            r#"
            INSERT INTO Targets (
                uuid,
                name,
                kind,
                destination,
                credentials,
                created_at,
                updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(target.uuid.as_bytes().as_slice())
        .bind(&target.name)
        .bind(serde_json::to_string(&target.kind).map_err(MiscError::SerializeError)?)
        .bind(&target.destination)
        .bind(serde_json::to_string(&target.credentials).map_err(MiscError::SerializeError)?)
        .bind(target.created_at)
        .bind(target.updated_at)
        .execute(&pool)
        .await
        .map_err(DatabaseError::StatementExecutionFailed)?;
        Ok(())
    }

    async fn modify_target(&self, target: &TargetDefinition) -> Result<(), Error> {
        let pool = self.get_pool();
        sqlx::query(
            r#"
            UPDATE Targets
            SET
                name = ?,
                kind = ?,
                destination = ?,
                credentials = ?,
                updated_at = ?
            WHERE uuid = ?
            "#,
        )
        .bind(&target.name)
        .bind(serde_json::to_string(&target.kind).map_err(MiscError::SerializeError)?)
        .bind(&target.destination)
        .bind(serde_json::to_string(&target.credentials).map_err(MiscError::SerializeError)?)
        .bind(target.updated_at)
        .bind(target.uuid.as_bytes().as_slice())
        .execute(&pool)
        .await
        .map_err(DatabaseError::StatementExecutionFailed)?;
        Ok(())
    }

    async fn remove_target(&self, uuid: Uuid) -> Result<(), Error> {
        let pool = self.get_pool();
        sqlx::query("DELETE FROM Targets WHERE uuid = ?")
            .bind(uuid.as_bytes().as_slice())
            .execute(&pool)
            .await
            .map_err(DatabaseError::StatementExecutionFailed)?;
        Ok(())
    }

    async fn get_target(&self, uuid: Uuid) -> Result<Option<TargetDefinition>, Error> {
        let pool = self.get_pool();
        let row = sqlx::query(
            r#"
            SELECT uuid, name, kind, destination, credentials, created_at, updated_at
            FROM Targets
            WHERE uuid = ?
            "#,
        )
        .bind(uuid.as_bytes().as_slice())
        .fetch_optional(&pool)
        .await
        .map_err(DatabaseError::StatementExecutionFailed)?;
        row.as_ref().map(target_from_row).transpose()
    }

    async fn get_all_targets(&self) -> Result<Vec<TargetDefinition>, Error> {
        let pool = self.get_pool();
        let rows = sqlx::query(
            r#"
            SELECT uuid, name, kind, destination, credentials, created_at, updated_at
            FROM Targets
            ORDER BY created_at
            "#,
        )
        .fetch_all(&pool)
        .await
        .map_err(DatabaseError::StatementExecutionFailed)?;
        rows.iter().map(target_from_row).collect()
    }
}

fn target_from_row(row: &SqliteRow) -> Result<TargetDefinition, Error> {
    let kind_str: String = column(row, "kind")?;
    let kind: TargetKind =
        serde_json::from_str(&kind_str).map_err(MiscError::DeserializeError)?;

    let credentials_str: String = column(row, "credentials")?;
    let credentials: Credentials =
        serde_json::from_str(&credentials_str).map_err(MiscError::DeserializeError)?;

    Ok(TargetDefinition {
        uuid: uuid_column(row, "uuid")?,
        name: column(row, "name")?,
        kind,
        destination: column(row, "destination")?,
        credentials,
        created_at: column(row, "created_at")?,
        updated_at: column(row, "updated_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::repository::schedule::ScheduleRepository;
    use crate::model::schedule::ScheduleDefinition;
    use chrono::Utc;

    fn drive_target() -> TargetDefinition {
        TargetDefinition::new(
            "drive",
            TargetKind::GoogleDrive,
            "Backups",
            Credentials {
                access_token: Some("token-1".into()),
                refresh_token: Some("refresh-1".into()),
                expires_at: Some(1_792_300_000_000),
                client_id: Some("client".into()),
                client_secret: Some("secret".into()),
                ..Credentials::default()
            },
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn refreshed_credentials_are_persisted() {
        let database = DatabaseManager::in_memory().await.unwrap();
        let mut target = drive_target();
        database.create_target(&target).await.unwrap();

        target.credentials.access_token = Some("token-2".into());
        target.credentials.expires_at = Some(1_792_303_600_000);
        database.modify_target(&target).await.unwrap();

        let stored = database.get_target(target.uuid).await.unwrap().unwrap();
        assert_eq!(stored.kind, TargetKind::GoogleDrive);
        assert_eq!(stored.credentials, target.credentials);
        assert_eq!(database.get_all_targets().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn removing_target_removes_its_schedules() {
        let database = DatabaseManager::in_memory().await.unwrap();
        let target = drive_target();
        database.create_target(&target).await.unwrap();
        let schedule =
            ScheduleDefinition::new("daily", "/srv/data", vec![1], "02:00", target.uuid, Utc::now());
        database.create_schedule(&schedule).await.unwrap();

        database.remove_target(target.uuid).await.unwrap();

        assert!(database.get_target(target.uuid).await.unwrap().is_none());
        assert!(database.get_schedule(schedule.uuid).await.unwrap().is_none());
        assert!(database.get_all_targets().await.unwrap().is_empty());
    }
}
