use crate::model::error::validation::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    Local,
    Sftp,
    Smb,
    Dropbox,
    GoogleDrive,
}

impl TargetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::Local => "local",
            TargetKind::Sftp => "sftp",
            TargetKind::Smb => "smb",
            TargetKind::Dropbox => "dropbox",
            TargetKind::GoogleDrive => "google_drive",
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind-specific connection settings. Which fields are required depends on the
/// owning target's kind.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub private_key: Option<String>,
    pub passphrase: Option<String>,
    pub share: Option<String>,
    pub domain: Option<String>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_at: Option<i64>, // epoch millis
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TargetDefinition {
    pub uuid: Uuid,
    pub name: String,
    pub kind: TargetKind,
    pub destination: String,
    pub credentials: Credentials,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TargetDefinition {
    pub fn new(
        name: impl Into<String>,
        kind: TargetKind,
        destination: impl Into<String>,
        credentials: Credentials,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: name.into(),
            kind,
            destination: destination.into(),
            credentials,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let credentials = &self.credentials;
        match self.kind {
            TargetKind::Local => Ok(()),
            TargetKind::Sftp => {
                self.require("host", &credentials.host)?;
                self.require("username", &credentials.username)?;
                Ok(())
            }
            TargetKind::Smb => {
                self.require("host", &credentials.host)?;
                self.require("share", &credentials.share)?;
                self.require("username", &credentials.username)?;
                self.require("password", &credentials.password)?;
                Ok(())
            }
            TargetKind::Dropbox | TargetKind::GoogleDrive => {
                self.require("accessToken", &credentials.access_token)?;
                Ok(())
            }
        }
    }

    pub fn require<'a>(
        &self,
        field: &str,
        value: &'a Option<String>,
    ) -> Result<&'a str, ValidationError> {
        match value.as_deref() {
            Some(value) if !value.is_empty() => Ok(value),
            _ => Err(ValidationError::MissingCredential(self.name.clone(), field)),
        }
    }
}
