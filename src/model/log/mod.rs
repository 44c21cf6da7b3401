pub mod backup;
pub mod database;
pub mod schedule;
pub mod system;
pub mod transport;
