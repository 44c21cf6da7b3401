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

const FOLDER_MIME: &str = "application/vnd.google-apps.folder";
const BOUNDARY: &str = "backup_relay_boundary";
const ROOT: &str = "root";

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
    #[serde(default)]
    size: Option<String>,
}

fn escape_query(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

pub fn folder_query(name: &str, parent: &str) -> String {
    format!(
        "name='{}' and mimeType='{FOLDER_MIME}' and trashed=false and '{}' in parents",
        escape_query(name),
        escape_query(parent)
    )
}

pub fn multipart_body(metadata: &serde_json::Value, content: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(content.len() + 512);
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{metadata}\r\n--{BOUNDARY}\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub struct GoogleDriveTransport {
    client: reqwest::Client,
    api_url: String,
    upload_url: String,
}

impl GoogleDriveTransport {
    pub fn new(
        client: reqwest::Client,
        api_url: impl Into<String>,
        upload_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            upload_url: upload_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn find_folder(
        &self,
        name: &str,
        parent: &str,
        token: &str,
    ) -> Result<Option<String>, TransportError> {
        let response = self
            .client
            .get(format!("{}/files", self.api_url))
            .bearer_auth(token)
            .query(&[
                ("q", folder_query(name, parent).as_str()),
                ("fields", "files(id,name)"),
                ("spaces", "drive"),
            ])
            .send()
            .await
            .map_err(send_failure)?;
        let list = ensure_success(response)
            .await?
            .json::<FileList>()
            .await
            .map_err(TransportError::Protocol)?;
        Ok(list.files.into_iter().next().map(|file| file.id))
    }

    async fn create_folder(
        &self,
        name: &str,
        parent: &str,
        token: &str,
    ) -> Result<String, TransportError> {
        let response = self
            .client
            .post(format!("{}/files", self.api_url))
            .bearer_auth(token)
            .query(&[("fields", "id")])
            .json(&json!({ "name": name, "mimeType": FOLDER_MIME, "parents": [parent] }))
            .send()
            .await
            .map_err(send_failure)?;
        let folder = ensure_success(response)
            .await?
            .json::<DriveFile>()
            .await
            .map_err(TransportError::Protocol)?;
        log!(TransportLog::DriveFolderCreated { name: name.to_string() });
        Ok(folder.id)
    }

    /// Walks the destination one folder at a time, creating missing ones.
    async fn resolve_folder(&self, destination: &str, token: &str) -> Result<String, TransportError> {
        let mut parent = ROOT.to_string();
        for name in destination.split('/').filter(|segment| !segment.is_empty()) {
            parent = match self.find_folder(name, &parent, token).await? {
                Some(id) => id,
                None => self.create_folder(name, &parent, token).await?,
            };
        }
        Ok(parent)
    }
}

#[async_trait]
impl Transport for GoogleDriveTransport {
    fn kind(&self) -> TargetKind {
        TargetKind::GoogleDrive
    }

    async fn ship(
        &self,
        local_file: &Path,
        target: &TargetDefinition,
    ) -> Result<ShipResult, TransportError> {
        let token = access_token(target)?;
        let name = file_name(local_file)?;
        let folder = self.resolve_folder(&target.destination, token).await?;

        let content = tokio::fs::read(local_file).await.map_err(|err| {
            TransportError::RemoteFs(format!("read {}: {err}", local_file.display()))
        })?;
        let metadata = json!({ "name": name, "parents": [folder] });

        let response = self
            .client
            .post(format!("{}/files", self.upload_url))
            .bearer_auth(token)
            .query(&[("uploadType", "multipart"), ("fields", "id,name,size")])
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/related; boundary={BOUNDARY}"),
            )
            .body(multipart_body(&metadata, &content))
            .send()
            .await
            .map_err(send_failure)?;
        let uploaded = ensure_success(response)
            .await?
            .json::<DriveFile>()
            .await
            .map_err(TransportError::Protocol)?;

        let folder_path = target.destination.trim_matches('/');
        Ok(ShipResult {
            remote_path: if folder_path.is_empty() {
                name
            } else {
                format!("{folder_path}/{name}")
            },
            remote_size: uploaded
                .size
                .and_then(|size| size.parse().ok())
                .or(Some(content.len() as u64)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::target::Credentials;
    use chrono::Utc;
    use mockito::Matcher;

    fn target(destination: &str) -> TargetDefinition {
        TargetDefinition::new(
            "drive",
            TargetKind::GoogleDrive,
            destination,
            Credentials {
                access_token: Some("drive-token".into()),
                ..Credentials::default()
            },
            Utc::now(),
        )
    }

    fn archive() -> (tempfile::TempDir, std::path::PathBuf) {
        let scratch = tempfile::tempdir().unwrap();
        let path = scratch.path().join("docs_1.tar.gz");
        std::fs::write(&path, b"archive-bytes").unwrap();
        (scratch, path)
    }

    fn transport(server: &mockito::Server) -> GoogleDriveTransport {
        GoogleDriveTransport::new(
            reqwest::Client::new(),
            format!("{}/drive/v3", server.url()),
            format!("{}/upload/drive/v3", server.url()),
        )
    }

    #[test]
    fn query_escapes_quotes() {
        assert_eq!(
            folder_query("Bob's", "root"),
            "name='Bob\\'s' and mimeType='application/vnd.google-apps.folder' and trashed=false and 'root' in parents"
        );
    }

    #[test]
    fn multipart_body_frames_both_parts() {
        let body = multipart_body(&json!({ "name": "a" }), b"DATA");
        let text = String::from_utf8(body).unwrap();
        assert!(text.starts_with("--backup_relay_boundary\r\nContent-Type: application/json"));
        assert!(text.contains("{\"name\":\"a\"}\r\n--backup_relay_boundary\r\n"));
        assert!(text.ends_with("DATA\r\n--backup_relay_boundary--\r\n"));
    }

    #[tokio::test]
    async fn uploads_into_existing_folder() {
        let mut server = mockito::Server::new_async().await;
        let lookup = server
            .mock("GET", "/drive/v3/files")
            .match_header("authorization", "Bearer drive-token")
            .match_query(Matcher::UrlEncoded("q".into(), folder_query("Backups", "root")))
            .with_body(r#"{"files":[{"id":"folder-1","name":"Backups"}]}"#)
            .create_async()
            .await;
        let create = server
            .mock("POST", "/drive/v3/files")
            .expect(0)
            .create_async()
            .await;
        let upload = server
            .mock("POST", "/upload/drive/v3/files")
            .match_header("authorization", "Bearer drive-token")
            .match_header("content-type", "multipart/related; boundary=backup_relay_boundary")
            .match_query(Matcher::UrlEncoded("uploadType".into(), "multipart".into()))
            .match_body(Matcher::Regex(r#""parents":\["folder-1"\]"#.into()))
            .with_body(r#"{"id":"file-9","name":"docs_1.tar.gz","size":"13"}"#)
            .create_async()
            .await;

        let (_scratch, file) = archive();
        let result = transport(&server).ship(&file, &target("/Backups")).await.unwrap();

        lookup.assert_async().await;
        create.assert_async().await;
        upload.assert_async().await;
        assert_eq!(result.remote_path, "Backups/docs_1.tar.gz");
        assert_eq!(result.remote_size, Some(13));
    }

    #[tokio::test]
    async fn creates_missing_folder() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/drive/v3/files")
            .match_query(Matcher::Any)
            .with_body(r#"{"files":[]}"#)
            .create_async()
            .await;
        let create = server
            .mock("POST", "/drive/v3/files")
            .match_query(Matcher::Any)
            .match_body(Matcher::PartialJsonString(
                r#"{"name":"Backups","mimeType":"application/vnd.google-apps.folder","parents":["root"]}"#.into(),
            ))
            .with_body(r#"{"id":"folder-new"}"#)
            .create_async()
            .await;
        let upload = server
            .mock("POST", "/upload/drive/v3/files")
            .match_query(Matcher::Any)
            .match_body(Matcher::Regex(r#""parents":\["folder-new"\]"#.into()))
            .with_body(r#"{"id":"file-1"}"#)
            .create_async()
            .await;

        let (_scratch, file) = archive();
        let result = transport(&server).ship(&file, &target("Backups")).await.unwrap();

        create.assert_async().await;
        upload.assert_async().await;
        assert_eq!(result.remote_size, Some(13));
    }

    #[tokio::test]
    async fn unauthorized_asks_for_reauthorization() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/upload/drive/v3/files")
            .match_query(Matcher::Any)
            .with_status(401)
            .with_body(r#"{"error":{"code":401,"message":"Invalid Credentials"}}"#)
            .create_async()
            .await;

        let (_scratch, file) = archive();
        let error = transport(&server).ship(&file, &target("")).await.unwrap_err();

        match error {
            TransportError::Auth { err } => assert!(err.contains("reauthorize")),
            other => panic!("unexpected error {other:?}"),
        }
    }
}
