//! Events service
//!
//! The per-tick sweep over the event store: recompute each event's
//! countdown, advance its staged notification latches and dispatch
//! reminders through the injected notifier.
//!
//! Each latch fires at most once per due occurrence. When the annual
//! rollover resolver moves an event's effective due year forward, the
//! latches are re-armed for the new occurrence.

use std::sync::Arc;

use chrono::{Datelike, Local, NaiveDateTime};

use crate::config::{NOW_WINDOW_SECS, SECS_PER_DAY};
use crate::duedate;
use crate::error::Result;
use crate::notify::{Notification, Notify};
use crate::services::settings::EventsSettings;
use crate::store::{Event, EventStore, Stage, CATEGORIES, HEADERS};

/// Stage thresholds in seconds, derived from the configured day-counts.
#[derive(Debug, Clone, Copy)]
pub struct Thresholds {
    pub stage1: i64,
    pub stage2: i64,
    pub stage3: i64,
}

impl From<&EventsSettings> for Thresholds {
    fn from(settings: &EventsSettings) -> Self {
        Self {
            stage1: settings.stage1_days as i64 * SECS_PER_DAY,
            stage2: settings.stage2_days as i64 * SECS_PER_DAY,
            stage3: settings.stage3_days as i64 * SECS_PER_DAY,
        }
    }
}

/// Decide which latch, if any, fires for the given countdown.
///
/// The first matching case wins, so at most one notification fires per
/// sweep per event even when several thresholds would newly qualify.
/// Priority: Now > Stage 3 > Stage 2 > Stage 1.
pub fn next_stage(remaining_secs: i64, event: &Event, thresholds: Thresholds) -> Option<Stage> {
    if remaining_secs <= NOW_WINDOW_SECS && !event.stage_fired(Stage::Now) {
        Some(Stage::Now)
    } else if remaining_secs <= thresholds.stage3 && !event.stage_fired(Stage::Stage3) {
        Some(Stage::Stage3)
    } else if remaining_secs <= thresholds.stage2 && !event.stage_fired(Stage::Stage2) {
        Some(Stage::Stage2)
    } else if remaining_secs <= thresholds.stage1 && !event.stage_fired(Stage::Stage1) {
        Some(Stage::Stage1)
    } else {
        None
    }
}

/// Service owning the event store and driving the reminder state machine.
pub struct EventsService {
    store: EventStore,
    settings: EventsSettings,
    notifier: Arc<dyn Notify>,
}

impl EventsService {
    pub fn new(store: EventStore, settings: EventsSettings, notifier: Arc<dyn Notify>) -> Self {
        Self {
            store,
            settings,
            notifier,
        }
    }

    /// Column labels for the display table.
    pub fn headers(&self) -> &'static [&'static str] {
        &HEADERS
    }

    /// Accepted categories for populating a selector.
    pub fn categories(&self) -> &'static [&'static str] {
        &CATEGORIES
    }

    /// The configured stage day-counts and colours.
    pub fn settings(&self) -> &EventsSettings {
        &self.settings
    }

    /// Insert or overwrite an event. The caller decides when to persist.
    pub fn add_event(&mut self, event: Event) {
        tracing::info!("Adding event: {}", event.name);
        self.store.add(event);
    }

    /// Delete an event and persist; missing keys are ignored.
    pub async fn delete_event(&mut self, name: &str) -> Result<()> {
        self.store.delete(name).await
    }

    /// Look up an event; a miss returns the sentinel record.
    pub fn get_event(&self, name: &str) -> Event {
        self.store.get(name)
    }

    /// All events as display rows, sorted by name.
    pub fn list_events(&self) -> Vec<[String; 7]> {
        self.store.list()
    }

    /// Number of stored events.
    pub fn count(&self) -> usize {
        self.store.count()
    }

    /// Persist the store explicitly.
    pub async fn save_events(&self) -> Result<()> {
        self.store.save().await
    }

    /// Run one sweep against the local clock.
    pub async fn update_events(&mut self) -> Result<()> {
        self.update_events_at(Local::now().naive_local()).await
    }

    /// Run one sweep against an explicit clock reading. The caller owning
    /// the tick can drive the sweep deterministically with this.
    ///
    /// A record whose stored date or time does not parse is skipped for
    /// this sweep; it never halts the sweep for other records.
    pub async fn update_events_at(&mut self, now: NaiveDateTime) -> Result<()> {
        let thresholds = Thresholds::from(&self.settings);

        for name in self.store.names() {
            let (remaining_secs, rolled_over) = {
                let Some(event) = self.store.get_mut(&name) else {
                    continue;
                };

                let due_date = match duedate::resolve_due_date(&event.date_due, now.date()) {
                    Ok(date) => date,
                    Err(e) => {
                        tracing::warn!("Skipping event '{}': {}", name, e);
                        continue;
                    }
                };
                let due = match duedate::due_instant(due_date, &event.time_due) {
                    Ok(due) => due,
                    Err(e) => {
                        tracing::warn!("Skipping event '{}': {}", name, e);
                        continue;
                    }
                };

                let rolled_over =
                    matches!(event.last_due_year, Some(prev) if due_date.year() > prev);
                if rolled_over {
                    tracing::info!(
                        "Event '{}' rolled over to {}, re-arming notifications",
                        name,
                        due_date.year()
                    );
                    event.reset_stages();
                }
                event.last_due_year = Some(due_date.year());

                let remaining_secs = (due - now).num_seconds();
                event.remaining = duedate::format_remaining(remaining_secs);

                (remaining_secs, rolled_over)
            };

            if rolled_over {
                self.store.save().await?;
            }

            self.check_event(&name, remaining_secs, thresholds).await?;
        }

        Ok(())
    }

    /// Advance the staged latches for one event, dispatching at most one
    /// notification. Firing persists the store immediately so the latch
    /// survives a restart.
    async fn check_event(
        &mut self,
        name: &str,
        remaining_secs: i64,
        thresholds: Thresholds,
    ) -> Result<()> {
        let notification = {
            let Some(event) = self.store.get_mut(name) else {
                return Ok(());
            };
            let Some(stage) = next_stage(remaining_secs, event, thresholds) else {
                return Ok(());
            };

            event.set_stage_fired(stage);

            Notification {
                event_name: event.name.clone(),
                remaining: event.remaining.clone(),
                stage,
            }
        };

        tracing::info!(
            "Event '{}' reached {} ({} left)",
            notification.event_name,
            notification.stage.label(),
            notification.remaining
        );
        self.notifier.notify(&notification);
        self.store.save().await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::LogNotifier;
    use chrono::NaiveDate;
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingNotifier {
        fired: Mutex<Vec<Notification>>,
    }

    impl RecordingNotifier {
        fn stages(&self) -> Vec<Stage> {
            self.fired.lock().unwrap().iter().map(|n| n.stage).collect()
        }
    }

    impl Notify for RecordingNotifier {
        fn notify(&self, notification: &Notification) {
            self.fired.lock().unwrap().push(notification.clone());
        }
    }

    fn event(name: &str, date_due: &str, time_due: &str) -> Event {
        Event {
            name: name.to_string(),
            date_due: date_due.to_string(),
            time_due: time_due.to_string(),
            category: "Birthday".to_string(),
            ..Event::default()
        }
    }

    fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(year, month, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    async fn create_test_service() -> (EventsService, Arc<RecordingNotifier>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = EventStore::open(temp_dir.path().join("events.csv"))
            .await
            .unwrap();
        let notifier = Arc::new(RecordingNotifier::default());
        let service = EventsService::new(store, EventsSettings::default(), notifier.clone());
        (service, notifier, temp_dir)
    }

    fn fresh(name: &str) -> Event {
        event(name, "15 June 1980", "12:00")
    }

    #[test]
    fn test_next_stage_priority_order() {
        let thresholds = Thresholds::from(&EventsSettings::default());
        let mut e = fresh("Dad");

        // Everything qualifies at once; only the highest priority fires.
        assert_eq!(next_stage(30, &e, thresholds), Some(Stage::Now));

        e.now_fired = true;
        assert_eq!(next_stage(30, &e, thresholds), Some(Stage::Stage3));

        e.stage3_fired = true;
        assert_eq!(next_stage(30, &e, thresholds), Some(Stage::Stage2));

        e.stage2_fired = true;
        assert_eq!(next_stage(30, &e, thresholds), Some(Stage::Stage1));

        e.stage1_fired = true;
        assert_eq!(next_stage(30, &e, thresholds), None);
    }

    #[test]
    fn test_next_stage_now_boundary() {
        let thresholds = Thresholds::from(&EventsSettings::default());
        let e = fresh("Dad");

        assert_eq!(next_stage(59, &e, thresholds), Some(Stage::Now));
        assert_eq!(next_stage(60, &e, thresholds), Some(Stage::Now));
        assert_eq!(next_stage(61, &e, thresholds), Some(Stage::Stage3));
    }

    #[test]
    fn test_next_stage_outside_all_thresholds() {
        let thresholds = Thresholds::from(&EventsSettings::default());
        let e = fresh("Dad");

        // 31 days out, nothing arms.
        assert_eq!(next_stage(31 * SECS_PER_DAY, &e, thresholds), None);
        // 30 days out, stage 3 arms.
        assert_eq!(
            next_stage(30 * SECS_PER_DAY, &e, thresholds),
            Some(Stage::Stage3)
        );
    }

    #[tokio::test]
    async fn test_sweep_updates_remaining() {
        let (mut service, _notifier, _temp) = create_test_service().await;

        service.add_event(event("Dad", "2 April 1958", "14:00"));
        service.update_events_at(at(2025, 11, 27, 12, 0)).await.unwrap();

        // Due 2 April 2026 14:00, 126 days and 2 hours away.
        assert_eq!(service.get_event("Dad").remaining, "126d 2h:0m");
    }

    #[tokio::test]
    async fn test_sweep_drains_latches_one_per_tick() {
        let (mut service, notifier, _temp) = create_test_service().await;

        service.add_event(fresh("Dad"));
        let now = at(2025, 6, 15, 11, 59);

        for _ in 0..5 {
            service.update_events_at(now).await.unwrap();
        }

        assert_eq!(
            notifier.stages(),
            vec![Stage::Now, Stage::Stage3, Stage::Stage2, Stage::Stage1]
        );

        let swept = service.get_event("Dad");
        assert!(swept.stage1_fired && swept.stage2_fired && swept.stage3_fired && swept.now_fired);
    }

    #[tokio::test]
    async fn test_fired_latch_is_persisted() {
        let (mut service, _notifier, temp) = create_test_service().await;

        service.add_event(fresh("Dad"));
        service.update_events_at(at(2025, 6, 15, 11, 59)).await.unwrap();

        let reloaded = EventStore::open(temp.path().join("events.csv"))
            .await
            .unwrap();
        assert!(reloaded.get("Dad").now_fired);
    }

    #[tokio::test]
    async fn test_stage3_fires_thirty_days_out() {
        let (mut service, notifier, _temp) = create_test_service().await;

        service.add_event(fresh("Dad"));
        service.update_events_at(at(2025, 5, 20, 12, 0)).await.unwrap();

        assert_eq!(notifier.stages(), vec![Stage::Stage3]);
        let swept = service.get_event("Dad");
        assert!(swept.stage3_fired);
        assert!(!swept.stage2_fired);
    }

    #[tokio::test]
    async fn test_no_notification_outside_thresholds() {
        let (mut service, notifier, _temp) = create_test_service().await;

        service.add_event(fresh("Dad"));
        service.update_events_at(at(2025, 1, 10, 12, 0)).await.unwrap();

        assert!(notifier.stages().is_empty());
    }

    #[tokio::test]
    async fn test_rollover_resets_latches() {
        let (mut service, notifier, _temp) = create_test_service().await;

        let mut e = fresh("Dad");
        e.stage1_fired = true;
        e.stage2_fired = true;
        e.stage3_fired = true;
        e.now_fired = true;
        service.add_event(e);

        // First sweep observes the 2025 occurrence; nothing can fire.
        service.update_events_at(at(2025, 6, 15, 13, 0)).await.unwrap();
        assert!(service.get_event("Dad").now_fired);

        // The next day the resolver lands on 2026; latches re-arm.
        service.update_events_at(at(2025, 6, 16, 12, 0)).await.unwrap();

        let rearmed = service.get_event("Dad");
        assert!(!rearmed.stage1_fired);
        assert!(!rearmed.stage2_fired);
        assert!(!rearmed.stage3_fired);
        assert!(!rearmed.now_fired);

        // A year out, nothing fires on the re-armed record yet.
        assert!(notifier.stages().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_record_does_not_halt_sweep() {
        let (mut service, notifier, _temp) = create_test_service().await;

        service.add_event(event("Broken", "someday", "never"));
        service.add_event(fresh("Dad"));

        service.update_events_at(at(2025, 6, 15, 11, 59)).await.unwrap();

        // The healthy record still fired; the broken one was skipped.
        assert_eq!(notifier.stages(), vec![Stage::Now]);
        assert!(service.get_event("Broken").remaining.is_empty());
    }

    #[tokio::test]
    async fn test_latches_do_not_refire_across_reload() {
        let (mut service, _notifier, temp) = create_test_service().await;

        service.add_event(fresh("Dad"));
        let now = at(2025, 6, 15, 11, 59);
        for _ in 0..4 {
            service.update_events_at(now).await.unwrap();
        }

        let store = EventStore::open(temp.path().join("events.csv"))
            .await
            .unwrap();
        let notifier = Arc::new(RecordingNotifier::default());
        let mut service =
            EventsService::new(store, EventsSettings::default(), notifier.clone());

        service.update_events_at(now).await.unwrap();
        assert!(notifier.stages().is_empty());
    }

    #[tokio::test]
    async fn test_headers_and_categories() {
        let (service, _notifier, _temp) = create_test_service().await;

        assert_eq!(service.headers().len(), 7);
        assert_eq!(service.headers()[6], "Left");
        assert_eq!(service.categories().len(), 9);
        assert!(service.categories().contains(&"Birthday"));
    }

    #[tokio::test]
    async fn test_log_notifier_is_usable() {
        let (_, _, temp) = create_test_service().await;
        let store = EventStore::open(temp.path().join("other.csv")).await.unwrap();
        let mut service =
            EventsService::new(store, EventsSettings::default(), Arc::new(LogNotifier));

        service.add_event(fresh("Dad"));
        service.update_events_at(at(2025, 6, 15, 11, 59)).await.unwrap();

        assert!(service.get_event("Dad").now_fired);
    }
}
