use crate::model::config::{Config, ConfigTable};
use crate::model::error::Error;
use crate::model::error::system::SystemError;
use std::fs;
use std::ops::Deref;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct AppConfig {
    config: Config,
}

impl AppConfig {
    pub fn new(path: &Path) -> Result<Self, Error> {
        let config = Self::load_config_file(path)?;
        Ok(Self { config })
    }

    pub fn from_config(config: Config) -> Self {
        Self { config }
    }

    fn load_config_file(path: &Path) -> Result<Config, Error> {
        let toml_string = fs::read_to_string(path).map_err(SystemError::ConfigNotFound)?;
        let config = toml::from_str::<ConfigTable>(&toml_string)
            .map_err(SystemError::InvalidConfig)?
            .config;
        Self::validate(&config)?;
        Ok(config)
    }

    fn validate(config: &Config) -> Result<(), SystemError> {
        if config.dropbox_chunk_size == 0 {
            return Err(SystemError::InvalidConfig("dropbox_chunk_size must be positive"));
        }
        if config.dropbox_upload_limit == 0 {
            return Err(SystemError::InvalidConfig("dropbox_upload_limit must be positive"));
        }
        if config.token_refresh_margin < 0 {
            return Err(SystemError::InvalidConfig("token_refresh_margin must not be negative"));
        }
        Ok(())
    }
}

impl Deref for AppConfig {
    type Target = Config;

    fn deref(&self) -> &Self::Target {
        &self.config
    }
}
