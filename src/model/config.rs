use crate::model::recurrence::ScheduleZone;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Deserialize)]
pub struct ConfigTable {
    #[serde(rename = "Config")]
    pub config: Config,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Config {
    pub database_url: String,
    pub log_directory: PathBuf,
    pub temp_directory: Option<PathBuf>,
    pub time_zone: ScheduleZone,
    pub token_refresh_margin: i64,  // second
    pub dropbox_upload_limit: u64,  // byte
    pub dropbox_chunk_size: u64,    // byte
    pub smbclient_path: String,
    pub google_token_url: String,
    pub google_drive_api_url: String,
    pub google_drive_upload_url: String,
    pub dropbox_token_url: String,
    pub dropbox_content_url: String,
}

impl Config {
    pub fn archive_directory(&self) -> PathBuf {
        self.temp_directory
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite://./backup_relay.db?mode=rwc".to_string(),
            log_directory: PathBuf::from("./logs"),
            temp_directory: None,
            time_zone: ScheduleZone::Local,
            token_refresh_margin: 300,
            dropbox_upload_limit: 150 * 1024 * 1024,
            dropbox_chunk_size: 8 * 1024 * 1024,
            smbclient_path: "smbclient".to_string(),
            google_token_url: "https://oauth2.googleapis.com/token".to_string(),
            google_drive_api_url: "https://www.googleapis.com/drive/v3".to_string(),
            google_drive_upload_url: "https://www.googleapis.com/upload/drive/v3".to_string(),
            dropbox_token_url: "https://api.dropboxapi.com/oauth2/token".to_string(),
            dropbox_content_url: "https://content.dropboxapi.com/2".to_string(),
        }
    }
}
