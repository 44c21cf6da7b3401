pub mod backup;
pub mod engine;
pub mod infrastructure;
pub mod schedule;
pub mod system;
pub mod transport;
