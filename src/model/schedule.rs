use crate::model::error::task::TaskError;
use crate::model::recurrence::RecurrenceRule;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::OnceLock;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct ScheduleDefinition {
    pub uuid: Uuid,
    pub name: String,
    pub source_path: PathBuf,
    pub is_active: bool,
    pub target_uuid: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    days_of_week: Vec<u8>,
    time_of_day: String,
    recurrence: OnceLock<RecurrenceRule>,
}

impl ScheduleDefinition {
    pub fn new(
        name: impl Into<String>,
        source_path: impl Into<PathBuf>,
        days_of_week: Vec<u8>,
        time_of_day: impl Into<String>,
        target_uuid: Uuid,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: name.into(),
            source_path: source_path.into(),
            is_active: true,
            target_uuid,
            created_at: now,
            updated_at: now,
            days_of_week,
            time_of_day: time_of_day.into(),
            recurrence: OnceLock::new(),
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        uuid: Uuid,
        name: String,
        source_path: PathBuf,
        days_of_week: Vec<u8>,
        time_of_day: String,
        is_active: bool,
        target_uuid: Uuid,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            uuid,
            name,
            source_path,
            is_active,
            target_uuid,
            created_at,
            updated_at,
            days_of_week,
            time_of_day,
            recurrence: OnceLock::new(),
        }
    }

    pub fn days_of_week(&self) -> &[u8] {
        &self.days_of_week
    }

    pub fn time_of_day(&self) -> &str {
        &self.time_of_day
    }

    pub fn set_days_of_week(&mut self, days_of_week: Vec<u8>) {
        self.days_of_week = days_of_week;
        self.recurrence = OnceLock::new();
    }

    pub fn set_time_of_day(&mut self, time_of_day: impl Into<String>) {
        self.time_of_day = time_of_day.into();
        self.recurrence = OnceLock::new();
    }

    pub fn recurrence_rule(&self) -> Result<RecurrenceRule, TaskError> {
        if let Some(rule) = self.recurrence.get() {
            return Ok(rule.clone());
        }
        let rule = RecurrenceRule::new(&self.days_of_week, &self.time_of_day)?;
        let _ = self.recurrence.set(rule.clone());
        Ok(rule)
    }

    pub fn has_cached_rule(&self) -> bool {
        self.recurrence.get().is_some()
    }
}
