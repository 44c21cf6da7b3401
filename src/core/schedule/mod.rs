pub mod schedule_registry;
pub mod trigger_scheduler;
