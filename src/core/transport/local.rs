use crate::interface::transport::{ShipResult, Transport, file_name};
use crate::model::error::transport::TransportError;
use crate::model::target::{TargetDefinition, TargetKind};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

pub struct LocalTransport;

#[async_trait]
impl Transport for LocalTransport {
    fn kind(&self) -> TargetKind {
        TargetKind::Local
    }

    async fn ship(
        &self,
        local_file: &Path,
        target: &TargetDefinition,
    ) -> Result<ShipResult, TransportError> {
        let destination = PathBuf::from(&target.destination);
        fs::create_dir_all(&destination).await.map_err(|err| {
            TransportError::RemoteFs(format!("create {}: {err}", destination.display()))
        })?;

        let remote_path = destination.join(file_name(local_file)?);
        let copied = fs::copy(local_file, &remote_path).await.map_err(|err| {
            TransportError::RemoteFs(format!(
                "copy {} to {}: {err}",
                local_file.display(),
                remote_path.display()
            ))
        })?;

        Ok(ShipResult {
            remote_path: remote_path.to_string_lossy().to_string(),
            remote_size: Some(copied),
        })
    }
}
