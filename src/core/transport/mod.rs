pub mod dropbox;
pub mod google_drive;
pub mod local;
pub mod sftp;
pub mod smb;

use crate::core::transport::dropbox::DropboxTransport;
use crate::core::transport::google_drive::GoogleDriveTransport;
use crate::core::transport::local::LocalTransport;
use crate::core::transport::sftp::SftpTransport;
use crate::core::transport::smb::SmbTransport;
use crate::interface::transport::Transport;
use crate::model::config::Config;
use crate::model::error::transport::TransportError;
use crate::model::target::{TargetDefinition, TargetKind};
use reqwest::StatusCode;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default, Clone)]
pub struct TransportRegistry {
    transports: HashMap<TargetKind, Arc<dyn Transport>>,
}

impl TransportRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn default_set(config: &Config, client: reqwest::Client) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(LocalTransport));
        registry.register(Arc::new(SftpTransport));
        registry.register(Arc::new(SmbTransport::new(config.smbclient_path.clone())));
        registry.register(Arc::new(DropboxTransport::new(
            client.clone(),
            config.dropbox_content_url.clone(),
            config.dropbox_upload_limit,
            config.dropbox_chunk_size,
        )));
        registry.register(Arc::new(GoogleDriveTransport::new(
            client,
            config.google_drive_api_url.clone(),
            config.google_drive_upload_url.clone(),
        )));
        registry
    }

    pub fn register(&mut self, transport: Arc<dyn Transport>) {
        self.transports.insert(transport.kind(), transport);
    }

    pub fn get(&self, kind: TargetKind) -> Result<Arc<dyn Transport>, TransportError> {
        self.transports
            .get(&kind)
            .cloned()
            .ok_or_else(|| TransportError::Unsupported(format!("no transport for {kind} targets")))
    }
}

pub(crate) fn access_token(target: &TargetDefinition) -> Result<&str, TransportError> {
    target
        .require("accessToken", &target.credentials.access_token)
        .map_err(|err| TransportError::Auth(format!("{err}; reauthorize the target")))
}

pub(crate) fn send_failure(err: reqwest::Error) -> TransportError {
    TransportError::Connect(err)
}

/// Passes 2xx responses through; 401 becomes an authentication failure.
pub(crate) async fn ensure_success(
    response: reqwest::Response,
) -> Result<reqwest::Response, TransportError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let detail = format!("HTTP {}: {}", status.as_u16(), body.trim());
    if status == StatusCode::UNAUTHORIZED {
        Err(TransportError::Auth(format!("{detail}; reauthorize the target")))
    } else {
        Err(TransportError::Protocol(detail))
    }
}
