use crate::model::error::task::TaskError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BackupStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl BackupStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackupStatus::Pending => "pending",
            BackupStatus::InProgress => "in_progress",
            BackupStatus::Completed => "completed",
            BackupStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BackupStatus::Completed | BackupStatus::Failed)
    }
}

impl fmt::Display for BackupStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BackupRecord {
    pub uuid: Uuid,
    pub source_path: PathBuf,
    pub status: BackupStatus,
    pub size: u64,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub schedule_uuid: Option<Uuid>,
    pub target_uuid: Uuid,
}

impl BackupRecord {
    pub fn new(
        source_path: PathBuf,
        schedule_uuid: Option<Uuid>,
        target_uuid: Uuid,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            source_path,
            status: BackupStatus::Pending,
            size: 0,
            error_message: None,
            created_at: now,
            completed_at: None,
            schedule_uuid,
            target_uuid,
        }
    }

    pub fn start(&mut self) -> Result<(), TaskError> {
        self.transition(BackupStatus::Pending, BackupStatus::InProgress)
    }

    pub fn record_size(&mut self, size: u64) -> Result<(), TaskError> {
        if self.status != BackupStatus::InProgress {
            return Err(self.illegal(BackupStatus::InProgress));
        }
        self.size = size;
        Ok(())
    }

    pub fn complete(&mut self, size: Option<u64>, now: DateTime<Utc>) -> Result<(), TaskError> {
        self.transition(BackupStatus::InProgress, BackupStatus::Completed)?;
        if let Some(size) = size {
            self.size = size;
        }
        self.completed_at = Some(now);
        Ok(())
    }

    pub fn fail(&mut self, message: impl Into<String>, now: DateTime<Utc>) -> Result<(), TaskError> {
        if self.status.is_terminal() {
            return Err(self.illegal(BackupStatus::Failed));
        }
        self.status = BackupStatus::Failed;
        self.error_message = Some(message.into());
        self.completed_at = Some(now);
        Ok(())
    }

    fn transition(&mut self, from: BackupStatus, to: BackupStatus) -> Result<(), TaskError> {
        if self.status != from {
            return Err(self.illegal(to));
        }
        self.status = to;
        Ok(())
    }

    fn illegal(&self, to: BackupStatus) -> TaskError {
        TaskError::IllegalTransition(self.status.as_str(), to.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> BackupRecord {
        BackupRecord::new(PathBuf::from("/srv/data"), None, Uuid::new_v4(), Utc::now())
    }

    #[test]
    fn happy_path_reaches_completed() {
        let mut backup = record();
        assert_eq!(backup.status, BackupStatus::Pending);
        assert_eq!(backup.size, 0);

        backup.start().unwrap();
        backup.record_size(2048).unwrap();
        backup.complete(None, Utc::now()).unwrap();

        assert_eq!(backup.status, BackupStatus::Completed);
        assert_eq!(backup.size, 2048);
        assert!(backup.completed_at.is_some());
        assert!(backup.error_message.is_none());
    }

    #[test]
    fn terminal_states_are_final() {
        let mut completed = record();
        completed.start().unwrap();
        completed.complete(Some(10), Utc::now()).unwrap();
        assert!(completed.fail("late", Utc::now()).is_err());
        assert!(completed.start().is_err());
        assert!(completed.record_size(99).is_err());
        assert_eq!(completed.status, BackupStatus::Completed);
        assert_eq!(completed.size, 10);

        let mut failed = record();
        failed.start().unwrap();
        failed.fail("disk full", Utc::now()).unwrap();
        assert!(failed.complete(Some(1), Utc::now()).is_err());
        assert!(failed.fail("again", Utc::now()).is_err());
        assert_eq!(failed.status, BackupStatus::Failed);
        assert_eq!(failed.error_message.as_deref(), Some("disk full"));
    }

    #[test]
    fn cannot_complete_without_starting() {
        let mut backup = record();
        assert_eq!(
            backup.complete(None, Utc::now()),
            Err(TaskError::IllegalTransition("pending", "completed"))
        );
    }
}
