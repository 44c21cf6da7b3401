pub mod archiver;
pub mod credential_refresher;
pub mod orchestrator;
