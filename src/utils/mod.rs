pub mod logging;
pub mod temp_artifact;
