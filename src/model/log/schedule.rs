use chrono::{DateTime, Utc};
use macros::loggable;
use uuid::Uuid;

loggable! {
    ScheduleLog {
        #[error("Loaded {count} active schedules")]
        ActiveSchedulesLoaded { count: usize } => tracing::Level::INFO,

        #[error("Timer armed for schedule {uuid} ({rule})")]
        TimerArmed { uuid: Uuid, rule: String } => tracing::Level::INFO,

        #[error("Timer replaced for schedule {uuid}")]
        TimerReplaced { uuid: Uuid } => tracing::Level::DEBUG,

        #[error("Timer cancelled for schedule {uuid}")]
        TimerCancelled { uuid: Uuid } => tracing::Level::INFO,

        #[error("Schedule {uuid} fired at {at}")]
        TimerFired { uuid: Uuid, at: DateTime<Utc> } => tracing::Level::INFO,

        #[error("Schedule {uuid} has no upcoming trigger")]
        NoUpcomingTrigger { uuid: Uuid } => tracing::Level::WARN,

        #[error("Schedule {uuid} is inactive, no timer armed")]
        ScheduleInactive { uuid: Uuid } => tracing::Level::DEBUG,
    }
}
