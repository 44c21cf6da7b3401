use crate::model::error::transport::TransportError;
use crate::model::target::{TargetDefinition, TargetKind};
use async_trait::async_trait;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShipResult {
    pub remote_path: String,
    pub remote_size: Option<u64>,
}

/// Moves one local file to one kind of destination.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    fn kind(&self) -> TargetKind;

    async fn ship(
        &self,
        local_file: &Path,
        target: &TargetDefinition,
    ) -> Result<ShipResult, TransportError>;
}

pub fn file_name(local_file: &Path) -> Result<String, TransportError> {
    local_file
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .ok_or_else(|| {
            TransportError::Unsupported(format!("{} has no file name", local_file.display()))
        })
}
