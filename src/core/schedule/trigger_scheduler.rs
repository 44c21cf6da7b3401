use crate::core::schedule::schedule_registry::{ScheduleRegistry, TimerHandle};
use crate::interface::clock::Clock;
use crate::interface::core::runnable::Runnable;
use crate::model::error::Error;
use crate::model::log::schedule::ScheduleLog;
use crate::model::recurrence::{RecurrenceRule, ScheduleZone};
use crate::model::schedule::ScheduleDefinition;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use macros::log;
use std::sync::Arc;
use tokio::select;
use tokio::sync::oneshot::Receiver;
use tokio::time::sleep;
use uuid::Uuid;

pub type FireCallback = Arc<dyn Fn(Uuid, DateTime<Utc>) + Send + Sync>;

/// One recurring timer for one schedule.
pub struct ScheduleTimer {
    schedule_uuid: Uuid,
    rule: RecurrenceRule,
    zone: ScheduleZone,
    clock: Arc<dyn Clock>,
    on_fire: FireCallback,
}

#[async_trait]
impl Runnable for ScheduleTimer {
    async fn run_impl(self: Arc<Self>, mut shutdown_rx: Receiver<()>) {
        let mut last = self.clock.now();
        loop {
            let now = self.clock.now();
            let Some(next) = self.rule.next_after(now.max(last), &self.zone) else {
                log!(ScheduleLog::NoUpcomingTrigger {
                    uuid: self.schedule_uuid
                });
                let _ = shutdown_rx.await;
                break;
            };
            let wait = (next - now).to_std().unwrap_or_default();
            select! {
                biased;
                _ = &mut shutdown_rx => { break; }
                _ = sleep(wait) => {}
            }
            if self.clock.now() < next {
                continue;
            }
            last = next;
            log!(ScheduleLog::TimerFired {
                uuid: self.schedule_uuid,
                at: next,
            });
            (self.on_fire)(self.schedule_uuid, next);
        }
    }
}

pub struct TriggerScheduler {
    registry: ScheduleRegistry,
    clock: Arc<dyn Clock>,
    zone: ScheduleZone,
    on_fire: FireCallback,
}

impl TriggerScheduler {
    pub fn new(clock: Arc<dyn Clock>, zone: ScheduleZone, on_fire: FireCallback) -> Self {
        Self {
            registry: ScheduleRegistry::new(),
            clock,
            zone,
            on_fire,
        }
    }

    pub fn zone(&self) -> &ScheduleZone {
        &self.zone
    }

    pub fn registry(&self) -> &ScheduleRegistry {
        &self.registry
    }

    /// Arms a timer for an active schedule. Any timer already registered for
    /// the same schedule is stopped before the new one starts, so at most one
    /// stays live.
    pub async fn schedule(&self, schedule: &ScheduleDefinition) -> Result<(), Error> {
        if !schedule.is_active {
            log!(ScheduleLog::ScheduleInactive {
                uuid: schedule.uuid
            });
            self.cancel(schedule.uuid).await;
            return Ok(());
        }
        let rule = schedule.recurrence_rule()?;
        let description = rule.to_string();

        if let Some(previous) = self.registry.remove(schedule.uuid) {
            previous.stop().await;
            log!(ScheduleLog::TimerReplaced {
                uuid: schedule.uuid
            });
        }

        let timer = Arc::new(ScheduleTimer {
            schedule_uuid: schedule.uuid,
            rule,
            zone: self.zone,
            clock: self.clock.clone(),
            on_fire: self.on_fire.clone(),
        });
        let (shutdown, handle) = timer.run();
        log!(ScheduleLog::TimerArmed {
            uuid: schedule.uuid,
            rule: description,
        });

        // A concurrent call for the same schedule may have armed in between.
        if let Some(raced) = self
            .registry
            .insert(schedule.uuid, TimerHandle::new(shutdown, handle))
        {
            raced.stop().await;
        }
        Ok(())
    }

    pub async fn reschedule(&self, schedule: &ScheduleDefinition) -> Result<(), Error> {
        self.schedule(schedule).await
    }

    pub async fn cancel(&self, uuid: Uuid) -> bool {
        match self.registry.remove(uuid) {
            Some(timer) => {
                timer.stop().await;
                log!(ScheduleLog::TimerCancelled { uuid });
                true
            }
            None => false,
        }
    }

    /// Arms one timer per active schedule; returns how many were armed.
    pub async fn load_active(&self, schedules: &[ScheduleDefinition]) -> usize {
        let mut armed = 0;
        for schedule in schedules.iter().filter(|schedule| schedule.is_active) {
            match self.schedule(schedule).await {
                Ok(()) => armed += 1,
                Err(err) => log!(err),
            }
        }
        log!(ScheduleLog::ActiveSchedulesLoaded { count: armed });
        armed
    }

    pub fn upcoming(
        &self,
        schedule: &ScheduleDefinition,
        count: usize,
    ) -> Result<Vec<DateTime<Utc>>, Error> {
        let rule = schedule.recurrence_rule()?;
        Ok(rule.upcoming(self.clock.now(), &self.zone, count))
    }

    pub async fn shutdown(&self) {
        for timer in self.registry.drain() {
            timer.stop().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, FixedOffset, TimeZone, Timelike, Weekday};
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::time::Instant;

    /// Wall clock that moves with tokio's paused test clock.
    struct TokioClock {
        origin: DateTime<Utc>,
        started: Instant,
    }

    impl Clock for TokioClock {
        fn now(&self) -> DateTime<Utc> {
            self.origin + chrono::Duration::from_std(self.started.elapsed()).unwrap()
        }
    }

    const DAY: Duration = Duration::from_secs(24 * 60 * 60);

    fn scheduler(origin: DateTime<Utc>) -> (TriggerScheduler, Arc<Mutex<Vec<(Uuid, DateTime<Utc>)>>>) {
        let fired = Arc::new(Mutex::new(Vec::new()));
        let sink = fired.clone();
        let clock = Arc::new(TokioClock {
            origin,
            started: Instant::now(),
        });
        let zone = ScheduleZone::Fixed(FixedOffset::east_opt(0).unwrap());
        let on_fire: FireCallback = Arc::new(move |uuid, at| sink.lock().unwrap().push((uuid, at)));
        (TriggerScheduler::new(clock, zone, on_fire), fired)
    }

    fn friday_midnight() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 0, 0, 0).unwrap()
    }

    fn weekday_schedule(time: &str) -> ScheduleDefinition {
        ScheduleDefinition::new("nightly", "/srv/data", vec![1, 2, 3, 4, 5], time, Uuid::new_v4(), friday_midnight())
    }

    #[tokio::test(start_paused = true)]
    async fn fires_on_weekdays_only() {
        let (scheduler, fired) = scheduler(friday_midnight());
        let schedule = weekday_schedule("03:00");
        scheduler.schedule(&schedule).await.unwrap();

        tokio::time::sleep(7 * DAY).await;

        let fired = fired.lock().unwrap().clone();
        let days: Vec<u32> = fired.iter().map(|(_, at)| at.day()).collect();
        assert_eq!(days, vec![16, 19, 20, 21, 22]);
        for (uuid, at) in fired {
            assert_eq!(uuid, schedule.uuid);
            assert!(!matches!(at.weekday(), Weekday::Sat | Weekday::Sun));
            assert_eq!((at.hour(), at.minute()), (3, 0));
        }
        scheduler.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn reschedule_leaves_a_single_timer() {
        let (scheduler, fired) = scheduler(friday_midnight());
        let mut schedule = weekday_schedule("03:00");
        scheduler.schedule(&schedule).await.unwrap();

        schedule.set_time_of_day("05:30");
        let (first, second) =
            tokio::join!(scheduler.reschedule(&schedule), scheduler.reschedule(&schedule));
        first.unwrap();
        second.unwrap();

        assert_eq!(scheduler.registry().len(), 1);
        assert!(scheduler.registry().is_running(schedule.uuid));

        tokio::time::sleep(DAY).await;
        let fired = fired.lock().unwrap().clone();
        assert_eq!(fired.len(), 1);
        assert_eq!((fired[0].1.hour(), fired[0].1.minute()), (5, 30));
        scheduler.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn rescheduling_just_after_a_firing_does_not_repeat_it() {
        let (scheduler, fired) = scheduler(friday_midnight());
        let schedule = weekday_schedule("03:00");
        scheduler.schedule(&schedule).await.unwrap();

        tokio::time::sleep(Duration::from_secs(3 * 60 * 60 + 1)).await;
        scheduler.reschedule(&schedule).await.unwrap();
        tokio::time::sleep(Duration::from_secs(60 * 60)).await;

        let at_three: Vec<_> = fired
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, at)| *at == friday_midnight() + chrono::Duration::hours(3))
            .cloned()
            .collect();
        assert_eq!(at_three.len(), 1);
        assert_eq!(scheduler.registry().len(), 1);
        scheduler.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_schedule_stops_firing() {
        let (scheduler, fired) = scheduler(friday_midnight());
        let schedule = weekday_schedule("03:00");
        scheduler.schedule(&schedule).await.unwrap();

        assert!(scheduler.cancel(schedule.uuid).await);
        assert!(!scheduler.cancel(schedule.uuid).await);
        tokio::time::sleep(7 * DAY).await;

        assert!(fired.lock().unwrap().is_empty());
        assert!(scheduler.registry().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn load_active_skips_inactive_schedules() {
        let (scheduler, _) = scheduler(friday_midnight());
        let active = weekday_schedule("03:00");
        let mut inactive = weekday_schedule("04:00");
        inactive.is_active = false;

        let armed = scheduler.load_active(&[active.clone(), inactive.clone()]).await;

        assert_eq!(armed, 1);
        assert!(scheduler.registry().contains(active.uuid));
        assert!(!scheduler.registry().contains(inactive.uuid));
        scheduler.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn empty_weekday_set_never_fires() {
        let (scheduler, fired) = scheduler(friday_midnight());
        let schedule = ScheduleDefinition::new("never", "/srv", Vec::new(), "03:00", Uuid::new_v4(), friday_midnight());
        scheduler.schedule(&schedule).await.unwrap();

        tokio::time::sleep(14 * DAY).await;

        assert!(fired.lock().unwrap().is_empty());
        assert!(scheduler.registry().is_running(schedule.uuid));
        scheduler.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn upcoming_lists_next_instants() {
        let (scheduler, _) = scheduler(friday_midnight());
        let upcoming = scheduler.upcoming(&weekday_schedule("03:00"), 3).unwrap();
        let days: Vec<u32> = upcoming.iter().map(|at| at.day()).collect();
        assert_eq!(days, vec![16, 19, 20]);
    }
}
