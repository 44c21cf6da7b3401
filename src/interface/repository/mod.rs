pub mod backup;
pub mod schedule;
pub mod target;
