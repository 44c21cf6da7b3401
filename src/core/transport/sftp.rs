use crate::interface::transport::{ShipResult, Transport, file_name};
use crate::model::error::transport::TransportError;
use crate::model::target::{Credentials, TargetDefinition, TargetKind};
use async_trait::async_trait;
use ssh2::{Session, Sftp};
use std::fs::File;
use std::io;
use std::net::TcpStream;
use std::ops::Deref;
use std::path::{Path, PathBuf};

const DEFAULT_PORT: u16 = 22;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SftpAuth {
    Password(String),
    PrivateKey {
        key: String,
        passphrase: Option<String>,
    },
}

impl SftpAuth {
    /// Exactly one of password or private key must be configured.
    pub fn from_credentials(credentials: &Credentials) -> Result<Self, TransportError> {
        let password = credentials.password.as_deref().filter(|value| !value.is_empty());
        let key = credentials.private_key.as_deref().filter(|value| !value.is_empty());
        match (password, key) {
            (Some(password), None) => Ok(SftpAuth::Password(password.to_string())),
            (None, Some(key)) => Ok(SftpAuth::PrivateKey {
                key: key.to_string(),
                passphrase: credentials.passphrase.clone().filter(|value| !value.is_empty()),
            }),
            (Some(_), Some(_)) => Err(TransportError::Unsupported(
                "SFTP target has both a password and a private key",
            )),
            (None, None) => Err(TransportError::Unsupported(
                "SFTP target has neither a password nor a private key",
            )),
        }
    }
}

/// POSIX join, independent of the host platform.
pub fn remote_join(directory: &str, name: &str) -> String {
    let directory = directory.trim_end_matches('/');
    if directory.is_empty() {
        if name.starts_with('/') { name.to_string() } else { format!("/{name}") }
    } else {
        format!("{directory}/{}", name.trim_start_matches('/'))
    }
}

fn remote_parent(path: &str) -> Option<&str> {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(0) | None => None,
        Some(index) => Some(&trimmed[..index]),
    }
}

pub trait RemoteDirectories {
    fn exists(&mut self, path: &str) -> bool;
    fn create(&mut self, path: &str) -> Result<(), TransportError>;
}

/// Creates `path` and any missing ancestors, parents first.
pub fn ensure_directory(
    remote: &mut impl RemoteDirectories,
    path: &str,
) -> Result<(), TransportError> {
    let path = path.trim_end_matches('/');
    if path.is_empty() || path == "." || remote.exists(path) {
        return Ok(());
    }
    if let Some(parent) = remote_parent(path) {
        ensure_directory(remote, parent)?;
    }
    remote.create(path)
}

struct SftpDirectories<'a>(&'a Sftp);

impl RemoteDirectories for SftpDirectories<'_> {
    fn exists(&mut self, path: &str) -> bool {
        self.0.stat(Path::new(path)).is_ok()
    }

    fn create(&mut self, path: &str) -> Result<(), TransportError> {
        self.0
            .mkdir(Path::new(path), 0o755)
            .map_err(|err| TransportError::RemoteFs(format!("mkdir {path}: {err}")))
    }
}

struct SessionGuard(Session);

impl Deref for SessionGuard {
    type Target = Session;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let _ = self.0.disconnect(None, "transfer finished", None);
    }
}

struct SftpUpload {
    host: String,
    port: u16,
    username: String,
    auth: SftpAuth,
    directory: String,
    remote_path: String,
    local_file: PathBuf,
}

impl SftpUpload {
    fn connect(&self) -> Result<SessionGuard, TransportError> {
        let tcp = TcpStream::connect((self.host.as_str(), self.port)).map_err(|err| {
            TransportError::Connect(format!("{}:{}: {err}", self.host, self.port))
        })?;
        let mut session = Session::new().map_err(TransportError::Connect)?;
        session.set_tcp_stream(tcp);
        session.handshake().map_err(TransportError::Connect)?;
        let session = SessionGuard(session);

        match &self.auth {
            SftpAuth::Password(password) => session
                .userauth_password(&self.username, password)
                .map_err(TransportError::Auth)?,
            SftpAuth::PrivateKey { key, passphrase } => session
                .userauth_pubkey_memory(&self.username, None, key, passphrase.as_deref())
                .map_err(TransportError::Auth)?,
        }
        if !session.authenticated() {
            return Err(TransportError::Auth(format!(
                "server rejected credentials for {}",
                self.username
            )));
        }
        Ok(session)
    }

    fn run(self) -> Result<ShipResult, TransportError> {
        let session = self.connect()?;
        let sftp = session.sftp().map_err(TransportError::Protocol)?;

        ensure_directory(&mut SftpDirectories(&sftp), &self.directory)?;

        let mut local = File::open(&self.local_file).map_err(|err| {
            TransportError::RemoteFs(format!("open {}: {err}", self.local_file.display()))
        })?;
        let mut remote = sftp
            .create(Path::new(&self.remote_path))
            .map_err(|err| TransportError::RemoteFs(format!("create {}: {err}", self.remote_path)))?;
        let copied = io::copy(&mut local, &mut remote)
            .map_err(|err| TransportError::RemoteFs(format!("write {}: {err}", self.remote_path)))?;
        drop(remote);

        let remote_size = sftp
            .stat(Path::new(&self.remote_path))
            .ok()
            .and_then(|stat| stat.size)
            .or(Some(copied));
        Ok(ShipResult {
            remote_path: self.remote_path,
            remote_size,
        })
    }
}

pub struct SftpTransport;

#[async_trait]
impl Transport for SftpTransport {
    fn kind(&self) -> TargetKind {
        TargetKind::Sftp
    }

    async fn ship(
        &self,
        local_file: &Path,
        target: &TargetDefinition,
    ) -> Result<ShipResult, TransportError> {
        let credentials = &target.credentials;
        let auth = SftpAuth::from_credentials(credentials)?;
        let host = target
            .require("host", &credentials.host)
            .map_err(TransportError::Unsupported)?;
        let username = target
            .require("username", &credentials.username)
            .map_err(TransportError::Unsupported)?;
        let upload = SftpUpload {
            host: host.to_string(),
            port: credentials.port.unwrap_or(DEFAULT_PORT),
            username: username.to_string(),
            auth,
            directory: target.destination.clone(),
            remote_path: remote_join(&target.destination, &file_name(local_file)?),
            local_file: local_file.to_path_buf(),
        };

        tokio::task::spawn_blocking(move || upload.run())
            .await
            .map_err(TransportError::Protocol)?
    }
}
