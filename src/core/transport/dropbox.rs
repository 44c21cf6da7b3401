use crate::core::transport::{access_token, ensure_success, send_failure};
use crate::interface::transport::{ShipResult, Transport, file_name};
use crate::model::error::transport::TransportError;
use crate::model::log::transport::TransportLog;
use crate::model::target::{TargetDefinition, TargetKind};
use async_trait::async_trait;
use macros::log;
use serde::Deserialize;
use serde_json::json;
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

const API_ARG: &str = "Dropbox-API-Arg";
const OCTET_STREAM: &str = "application/octet-stream";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    pub offset: u64,
    pub length: u64,
}

/// Splits `size` bytes into consecutive chunks of at most `chunk_size`.
pub fn plan_chunks(size: u64, chunk_size: u64) -> Vec<Chunk> {
    let chunk_size = chunk_size.max(1);
    let mut chunks = Vec::new();
    let mut offset = 0;
    while offset < size {
        let length = chunk_size.min(size - offset);
        chunks.push(Chunk { offset, length });
        offset += length;
    }
    chunks
}

pub fn remote_path(destination: &str, name: &str) -> String {
    let folder = destination.trim_matches('/');
    if folder.is_empty() {
        format!("/{name}")
    } else {
        format!("/{folder}/{name}")
    }
}

#[derive(Debug, Deserialize)]
struct FileMetadata {
    path_display: Option<String>,
    size: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct SessionStart {
    session_id: String,
}

pub struct DropboxTransport {
    client: reqwest::Client,
    content_url: String,
    upload_limit: u64,
    chunk_size: u64,
}

impl DropboxTransport {
    pub fn new(
        client: reqwest::Client,
        content_url: impl Into<String>,
        upload_limit: u64,
        chunk_size: u64,
    ) -> Self {
        Self {
            client,
            content_url: content_url.into().trim_end_matches('/').to_string(),
            upload_limit,
            chunk_size,
        }
    }

    fn commit(path: &str) -> serde_json::Value {
        json!({ "path": path, "mode": "add", "autorename": true, "mute": false })
    }

    async fn call(
        &self,
        endpoint: &str,
        token: &str,
        argument: serde_json::Value,
        body: Vec<u8>,
    ) -> Result<reqwest::Response, TransportError> {
        let response = self
            .client
            .post(format!("{}/{endpoint}", self.content_url))
            .bearer_auth(token)
            .header(API_ARG, argument.to_string())
            .header(reqwest::header::CONTENT_TYPE, OCTET_STREAM)
            .body(body)
            .send()
            .await
            .map_err(send_failure)?;
        ensure_success(response).await
    }

    async fn upload_single(
        &self,
        local_file: &Path,
        path: &str,
        token: &str,
    ) -> Result<FileMetadata, TransportError> {
        let body = tokio::fs::read(local_file).await.map_err(|err| {
            TransportError::RemoteFs(format!("read {}: {err}", local_file.display()))
        })?;
        self.call("files/upload", token, Self::commit(path), body)
            .await?
            .json::<FileMetadata>()
            .await
            .map_err(TransportError::Protocol)
    }

    async fn upload_session(
        &self,
        local_file: &Path,
        size: u64,
        path: &str,
        token: &str,
    ) -> Result<FileMetadata, TransportError> {
        let session = self
            .call("files/upload_session/start", token, json!({ "close": false }), Vec::new())
            .await?
            .json::<SessionStart>()
            .await
            .map_err(TransportError::Protocol)?;

        let mut file = File::open(local_file).await.map_err(|err| {
            TransportError::RemoteFs(format!("open {}: {err}", local_file.display()))
        })?;
        for chunk in plan_chunks(size, self.chunk_size) {
            let mut buffer = Vec::with_capacity(chunk.length as usize);
            (&mut file)
                .take(chunk.length)
                .read_to_end(&mut buffer)
                .await
                .map_err(|err| {
                    TransportError::RemoteFs(format!("read {}: {err}", local_file.display()))
                })?;
            let argument = json!({
                "cursor": { "session_id": session.session_id, "offset": chunk.offset },
                "close": false,
            });
            self.call("files/upload_session/append_v2", token, argument, buffer)
                .await?;
        }

        let argument = json!({
            "cursor": { "session_id": session.session_id, "offset": size },
            "commit": Self::commit(path),
        });
        let metadata = self
            .call("files/upload_session/finish", token, argument, Vec::new())
            .await?
            .json::<FileMetadata>()
            .await
            .map_err(TransportError::Protocol)?;
        log!(TransportLog::DropboxSessionFinished {
            session: session.session_id,
            offset: size,
        });
        Ok(metadata)
    }
}

#[async_trait]
impl Transport for DropboxTransport {
    fn kind(&self) -> TargetKind {
        TargetKind::Dropbox
    }

    async fn ship(
        &self,
        local_file: &Path,
        target: &TargetDefinition,
    ) -> Result<ShipResult, TransportError> {
        let token = access_token(target)?;
        let size = tokio::fs::metadata(local_file)
            .await
            .map_err(|err| TransportError::RemoteFs(format!("stat {}: {err}", local_file.display())))?
            .len();
        let path = remote_path(&target.destination, &file_name(local_file)?);

        let metadata = if size < self.upload_limit {
            self.upload_single(local_file, &path, token).await?
        } else {
            self.upload_session(local_file, size, &path, token).await?
        };

        Ok(ShipResult {
            remote_path: metadata.path_display.unwrap_or(path),
            remote_size: metadata.size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::target::Credentials;
    use chrono::Utc;
    use mockito::Matcher;

    fn target() -> TargetDefinition {
        TargetDefinition::new(
            "dropbox",
            TargetKind::Dropbox,
            "/Backups/",
            Credentials {
                access_token: Some("dbx-token".into()),
                ..Credentials::default()
            },
            Utc::now(),
        )
    }

    fn archive(bytes: usize) -> (tempfile::TempDir, std::path::PathBuf) {
        let scratch = tempfile::tempdir().unwrap();
        let path = scratch.path().join("photos_1.tar.gz");
        std::fs::write(&path, vec![7u8; bytes]).unwrap();
        (scratch, path)
    }

    #[test]
    fn chunks_cover_the_whole_file() {
        assert_eq!(
            plan_chunks(10, 4),
            vec![
                Chunk { offset: 0, length: 4 },
                Chunk { offset: 4, length: 4 },
                Chunk { offset: 8, length: 2 },
            ]
        );
        assert_eq!(plan_chunks(8, 4).len(), 2);
        assert!(plan_chunks(0, 4).is_empty());
    }

    #[test]
    fn remote_path_is_rooted() {
        assert_eq!(remote_path("/Backups/", "a.tar.gz"), "/Backups/a.tar.gz");
        assert_eq!(remote_path("", "a.tar.gz"), "/a.tar.gz");
    }

    #[tokio::test]
    async fn small_file_uses_single_upload() {
        let mut server = mockito::Server::new_async().await;
        let upload = server
            .mock("POST", "/files/upload")
            .match_header("authorization", "Bearer dbx-token")
            .match_header(
                "dropbox-api-arg",
                Matcher::PartialJsonString(
                    r#"{"path":"/Backups/photos_1.tar.gz","mode":"add","autorename":true}"#.into(),
                ),
            )
            .with_body(r#"{"path_display":"/Backups/photos_1.tar.gz","size":64}"#)
            .create_async()
            .await;
        let session = server
            .mock("POST", Matcher::Regex("upload_session".into()))
            .expect(0)
            .create_async()
            .await;

        let (_scratch, file) = archive(64);
        let transport = DropboxTransport::new(reqwest::Client::new(), server.url(), 100, 16);
        let result = transport.ship(&file, &target()).await.unwrap();

        upload.assert_async().await;
        session.assert_async().await;
        assert_eq!(result.remote_path, "/Backups/photos_1.tar.gz");
        assert_eq!(result.remote_size, Some(64));
    }

    #[tokio::test]
    async fn large_file_uses_upload_session() {
        let mut server = mockito::Server::new_async().await;
        let start = server
            .mock("POST", "/files/upload_session/start")
            .with_body(r#"{"session_id":"sess-1"}"#)
            .create_async()
            .await;
        let append = server
            .mock("POST", "/files/upload_session/append_v2")
            .match_header(
                "dropbox-api-arg",
                Matcher::PartialJsonString(r#"{"cursor":{"session_id":"sess-1"}}"#.into()),
            )
            .expect(3)
            .create_async()
            .await;
        let finish = server
            .mock("POST", "/files/upload_session/finish")
            .match_header(
                "dropbox-api-arg",
                Matcher::PartialJsonString(
                    r#"{"cursor":{"session_id":"sess-1","offset":10},"commit":{"path":"/Backups/photos_1.tar.gz"}}"#.into(),
                ),
            )
            .with_body(r#"{"path_display":"/Backups/photos_1.tar.gz","size":10}"#)
            .create_async()
            .await;
        let single = server
            .mock("POST", "/files/upload")
            .expect(0)
            .create_async()
            .await;

        let (_scratch, file) = archive(10);
        let transport = DropboxTransport::new(reqwest::Client::new(), server.url(), 10, 4);
        let result = transport.ship(&file, &target()).await.unwrap();

        start.assert_async().await;
        append.assert_async().await;
        finish.assert_async().await;
        single.assert_async().await;
        assert_eq!(result.remote_size, Some(10));
    }

    #[tokio::test]
    async fn unauthorized_maps_to_auth_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/files/upload")
            .with_status(401)
            .with_body(r#"{"error_summary":"expired_access_token/"}"#)
            .create_async()
            .await;

        let (_scratch, file) = archive(8);
        let transport = DropboxTransport::new(reqwest::Client::new(), server.url(), 100, 16);
        let error = transport.ship(&file, &target()).await.unwrap_err();

        assert!(matches!(error, TransportError::Auth { .. }));
    }

    #[tokio::test]
    async fn missing_token_is_rejected_before_network() {
        let mut target = target();
        target.credentials.access_token = None;
        let (_scratch, file) = archive(8);
        let transport =
            DropboxTransport::new(reqwest::Client::new(), "http://127.0.0.1:9", 100, 16);

        let error = transport.ship(&file, &target).await.unwrap_err();

        assert!(matches!(error, TransportError::Auth { .. }));
        assert!(error.to_string().contains("reauthorize"));
    }
}
