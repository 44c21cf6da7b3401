pub mod clock;
pub mod core;
pub mod repository;
pub mod transport;
