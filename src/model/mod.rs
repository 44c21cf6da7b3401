pub mod backup;
pub mod config;
pub mod error;
pub mod log;
pub mod recurrence;
pub mod schedule;
pub mod target;
