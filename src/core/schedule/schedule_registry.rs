use crate::model::error::system::SystemError;
use dashmap::DashMap;
use macros::log;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use uuid::Uuid;

pub struct TimerHandle {
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl TimerHandle {
    pub fn new(shutdown: oneshot::Sender<()>, handle: JoinHandle<()>) -> Self {
        Self { shutdown, handle }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub async fn stop(self) {
        if self.shutdown.send(()).is_err() {
            log!(SystemError::ShutdownSignalFailed);
        }
        if let Err(err) = self.handle.await {
            log!(SystemError::ThreadPanic(err));
        }
    }
}

/// Live timers keyed by schedule. Each key holds at most one handle; writers
/// take the displaced handle out and stop it themselves.
#[derive(Default)]
pub struct ScheduleRegistry {
    timers: DashMap<Uuid, TimerHandle>,
}

impl ScheduleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, uuid: Uuid, timer: TimerHandle) -> Option<TimerHandle> {
        self.timers.insert(uuid, timer)
    }

    pub fn remove(&self, uuid: Uuid) -> Option<TimerHandle> {
        self.timers.remove(&uuid).map(|(_, timer)| timer)
    }

    pub fn contains(&self, uuid: Uuid) -> bool {
        self.timers.contains_key(&uuid)
    }

    pub fn is_running(&self, uuid: Uuid) -> bool {
        self.timers
            .get(&uuid)
            .map(|timer| !timer.is_finished())
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    pub fn drain(&self) -> Vec<TimerHandle> {
        let keys: Vec<Uuid> = self.timers.iter().map(|pair| *pair.key()).collect();
        keys.into_iter().filter_map(|uuid| self.remove(uuid)).collect()
    }
}
