use crate::core::engine::Engine;
use crate::core::infrastructure::app_config::AppConfig;
use crate::core::infrastructure::database_manager::DatabaseManager;
use crate::interface::clock::SystemClock;
use crate::model::error::Error;
use crate::model::error::system::SystemError;
use crate::model::log::system::SystemLog;
use crate::utils::logging::Logging;
use macros::log;
use std::path::Path;
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;

pub struct System {
    database_manager: Arc<DatabaseManager>,
    engine: Engine,
    _guard: WorkerGuard,
}

impl System {
    pub async fn initialize(config_path: &Path) -> Result<Self, Error> {
        let app_config = AppConfig::new(config_path)?;
        let guard = Logging::initialize(&app_config.log_directory)?;
        log!(SystemLog::Initializing);

        let database_manager = Arc::new(DatabaseManager::new(&app_config.database_url).await?);
        let client = reqwest::Client::builder()
            .user_agent(concat!("backup-relay/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(SystemError::HttpClientFailed)?;
        let engine = Engine::new(
            &app_config,
            database_manager.clone(),
            Arc::new(SystemClock),
            client,
        );

        log!(SystemLog::InitializeComplete);
        Ok(Self {
            database_manager,
            engine,
            _guard: guard,
        })
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Arms the schedules and serves until Ctrl-C.
    pub async fn run(&self) -> Result<(), Error> {
        self.engine.start().await?;
        log!(SystemLog::Online);
        tokio::signal::ctrl_c()
            .await
            .map_err(SystemError::SignalListenFailed)?;
        Ok(())
    }

    pub async fn terminate(self) {
        log!(SystemLog::Terminating);
        self.engine.shutdown().await;
        self.database_manager.close_connection().await;
        log!(SystemLog::TerminateComplete);
    }
}
