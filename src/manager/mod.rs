/// State manager for one execution context
///
/// The manager owns the in-memory `UserGoals` of its context. Intents are the
/// only way to change it: each one is stamped with time and fresh ids, run
/// through the engine, persisted and then swapped in. Changes written by
/// other contexts replace the state wholesale (last writer wins).

pub mod view;

pub use view::{GoalSummary, ProgressView, RoadmapSummary};

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::clock::{Clock, SystemClock};
use crate::config::TrackerConfig;
use crate::domain::{
    Category, GoalDraft, GoalId, ItemDraft, ItemId, RoadmapDraft, RoadmapId, UserGoals,
};
use crate::engine::{self, Action};
use crate::remote::RemoteBackup;
use crate::session::{SessionRunner, SessionTimer, TimerSnapshot};
use crate::storage::{save, KeyValueStore, StorageEvent, Subscription};
use crate::TrackerError;

/// A request from the rendering layer
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    AddGoal(GoalDraft),
    DeleteGoal(GoalId),
    ResetGoal(GoalId),
    AddRoadmap(RoadmapDraft),
    DeleteRoadmap(RoadmapId),
    AddItem {
        roadmap_id: RoadmapId,
        draft: ItemDraft,
    },
    CompleteItem {
        roadmap_id: RoadmapId,
        item_id: ItemId,
    },
    UncompleteItem {
        roadmap_id: RoadmapId,
        item_id: ItemId,
    },
    RecordActivity {
        category: Category,
        amount: f64,
    },
    /// Start a countdown; on completion its length in minutes is recorded as
    /// activity in `category`
    StartSession {
        duration_secs: i64,
        category: Category,
    },
    CancelSession,
}

/// Message sent from the tick task back to the manager
#[derive(Debug, Clone, Copy, PartialEq)]
enum SessionEvent {
    Completed {
        category: Category,
        duration_secs: u32,
        /// Scheduled end of the countdown on the manager's clock
        finished_at: DateTime<Utc>,
    },
}

pub struct StateManager<S: KeyValueStore> {
    store: S,
    config: TrackerConfig,
    key: String,
    state: UserGoals,
    clock: Box<dyn Clock>,
    backup: Option<Box<dyn RemoteBackup>>,
    inbox: Rc<RefCell<VecDeque<StorageEvent>>>,
    subscription: Subscription,
    session: Option<SessionRunner>,
    session_tx: mpsc::UnboundedSender<SessionEvent>,
    session_rx: mpsc::UnboundedReceiver<SessionEvent>,
}

impl<S: KeyValueStore> StateManager<S> {
    /// Load the user's state from `store` and start listening for changes
    ///
    /// A missing or malformed document yields an empty state; opening never fails.
    pub fn open(store: S, config: TrackerConfig) -> Self {
        let key = config.storage_key();
        let state = Self::load(&store, &key);

        let inbox: Rc<RefCell<VecDeque<StorageEvent>>> = Rc::default();
        let sink = inbox.clone();
        let subscription = store.subscribe(
            &key,
            Box::new(move |event| sink.borrow_mut().push_back(event.clone())),
        );

        let (session_tx, session_rx) = mpsc::unbounded_channel();
        tracing::info!(
            "Opened tracker state for {} ({} goals, {} roadmaps)",
            config.user,
            state.goals.len(),
            state.roadmaps.len()
        );

        Self {
            store,
            config,
            key,
            state,
            clock: Box::new(SystemClock),
            backup: None,
            inbox,
            subscription,
            session: None,
            session_tx,
            session_rx,
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_backup(mut self, backup: impl RemoteBackup + 'static) -> Self {
        self.backup = Some(Box::new(backup));
        self
    }

    pub fn state(&self) -> &UserGoals {
        &self.state
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn storage_key(&self) -> &str {
        &self.key
    }

    pub fn subscription(&self) -> &Subscription {
        &self.subscription
    }

    pub fn session_snapshot(&self) -> Option<TimerSnapshot> {
        self.session.as_ref().map(|s| s.snapshot())
    }

    pub fn view(&self) -> ProgressView {
        ProgressView::build(
            &self.state,
            self.session_snapshot(),
            self.clock.now().date_naive(),
        )
    }

    /// Apply one intent against the latest state and return the new view
    ///
    /// A rejected intent leaves the state untouched.
    pub fn dispatch(&mut self, intent: Intent) -> Result<ProgressView, TrackerError> {
        self.sync();

        match intent {
            Intent::StartSession {
                duration_secs,
                category,
            } => self.start_session(duration_secs, category)?,
            Intent::CancelSession => self.cancel_session(),
            other => {
                if let Some(action) = self.stamp(other) {
                    self.commit(&action)?;
                }
            }
        }

        Ok(self.view())
    }

    /// Apply pending changes from other contexts and finished sessions
    ///
    /// Returns whether the in-memory state changed.
    pub fn sync(&mut self) -> bool {
        self.store.poll_changes();

        let pending: Vec<StorageEvent> = self.inbox.borrow_mut().drain(..).collect();
        let mut changed = false;
        for event in pending {
            changed |= self.apply_external(event);
        }

        changed | self.drain_session_events()
    }

    fn load(store: &S, key: &str) -> UserGoals {
        let Some(value) = store.get(key) else {
            return UserGoals::default();
        };
        UserGoals::from_json_value(value).unwrap_or_else(|e| {
            tracing::warn!("Stored state under '{}' is malformed, starting empty: {}", key, e);
            UserGoals::default()
        })
    }

    fn apply_external(&mut self, event: StorageEvent) -> bool {
        let Some(raw) = event.new_value else {
            tracing::warn!("'{}' was removed by another context, keeping current state", event.key);
            return false;
        };

        let parsed = serde_json::from_str::<Value>(&raw).and_then(UserGoals::from_json_value);
        match parsed {
            Ok(state) => {
                tracing::debug!("Replacing state with revision {} from another context", event.revision);
                self.state = state;
                true
            }
            Err(e) => {
                tracing::warn!("Ignoring unparsable external change to '{}': {}", event.key, e);
                false
            }
        }
    }

    /// Attach the current time and fresh ids to an intent
    ///
    /// Session intents never reach the engine and yield `None`.
    fn stamp(&self, intent: Intent) -> Option<Action> {
        let at = self.clock.now();
        let action = match intent {
            Intent::AddGoal(draft) => Action::AddGoal {
                id: GoalId::new(),
                draft,
            },
            Intent::DeleteGoal(id) => Action::DeleteGoal { id },
            Intent::ResetGoal(id) => Action::ResetGoal { id },
            Intent::AddRoadmap(draft) => Action::AddRoadmap {
                id: RoadmapId::new(),
                draft,
                at,
            },
            Intent::DeleteRoadmap(id) => Action::DeleteRoadmap { id },
            Intent::AddItem { roadmap_id, draft } => Action::AddItem {
                roadmap_id,
                item_id: ItemId::new(),
                draft,
                at,
            },
            Intent::CompleteItem {
                roadmap_id,
                item_id,
            } => Action::CompleteItem {
                roadmap_id,
                item_id,
                at,
            },
            Intent::UncompleteItem {
                roadmap_id,
                item_id,
            } => Action::UncompleteItem {
                roadmap_id,
                item_id,
                at,
            },
            Intent::RecordActivity { category, amount } => Action::RecordActivity {
                category,
                amount,
                at,
            },
            Intent::StartSession { .. } | Intent::CancelSession => return None,
        };
        Some(action)
    }

    fn commit(&mut self, action: &Action) -> Result<(), TrackerError> {
        let next = engine::apply(&self.state, action)?;
        save(&self.store, &self.key, &next);
        self.state = next;

        if let Some(backup) = &self.backup {
            if let Err(e) = backup.push(&self.config.user, &self.state) {
                tracing::warn!("Remote backup failed, continuing locally: {}", e);
            }
        }
        Ok(())
    }

    fn start_session(&mut self, duration_secs: i64, category: Category) -> Result<(), TrackerError> {
        let tx = self.session_tx.clone();
        let timer = SessionTimer::new(duration_secs)?;
        let seconds = timer.duration();
        let started_at = self.clock.now();
        let finished_at = chrono::Duration::from_std(self.config.tick_period.saturating_mul(seconds))
            .ok()
            .and_then(|length| started_at.checked_add_signed(length))
            .unwrap_or(started_at);
        let timer = timer.with_completion(move || {
            let _ = tx.send(SessionEvent::Completed {
                category,
                duration_secs: seconds,
                finished_at,
            });
        });

        let runner = SessionRunner::spawn(timer, self.config.tick_period)?;
        if let Some(mut previous) = self.session.replace(runner) {
            tracing::debug!("Replacing running session");
            previous.cancel();
        }
        tracing::info!("Started {}s {} session", seconds, category.display_name());
        Ok(())
    }

    fn cancel_session(&mut self) {
        if let Some(mut runner) = self.session.take() {
            runner.cancel();
            tracing::info!("Session cancelled");
        }
    }

    fn drain_session_events(&mut self) -> bool {
        let mut changed = false;
        while let Ok(event) = self.session_rx.try_recv() {
            let SessionEvent::Completed {
                category,
                duration_secs,
                finished_at,
            } = event;
            let action = Action::RecordActivity {
                category,
                amount: f64::from(duration_secs) / 60.0,
                at: finished_at,
            };
            match self.commit(&action) {
                Ok(()) => changed = true,
                Err(e) => tracing::warn!("Could not record finished session: {}", e),
            }
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::domain::{ItemType, Priority, UserId};
    use crate::engine::{EngineError, EntityKind};
    use crate::storage::{MemoryBackend, MemoryStore};
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use serde_json::json;
    use std::time::Duration as StdDuration;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 9, 2, 18, 0, 0).unwrap()
    }

    fn config() -> TrackerConfig {
        TrackerConfig::for_user(UserId::from("learner"))
    }

    fn manager_on(medium: &MemoryBackend) -> (StateManager<MemoryStore>, ManualClock) {
        let clock = ManualClock::new(t0());
        let manager =
            StateManager::open(MemoryStore::new(medium.clone()), config()).with_clock(clock.clone());
        (manager, clock)
    }

    fn minutes_goal(category: Category, target: f64) -> Intent {
        Intent::AddGoal(GoalDraft {
            name: "Practice".to_string(),
            category,
            target,
            unit: "minutes".to_string(),
            deadline: None,
        })
    }

    #[test]
    fn test_dispatch_persists_under_user_key() {
        let medium = MemoryBackend::new();
        let (mut manager, _clock) = manager_on(&medium);

        let view = manager.dispatch(minutes_goal(Category::Reading, 30.0)).unwrap();
        assert_eq!(view.goals.len(), 1);

        let reopened = StateManager::open(MemoryStore::new(medium.clone()), config());
        assert_eq!(reopened.state(), manager.state());
        assert_eq!(manager.storage_key(), "userGoals:learner");
    }

    #[test]
    fn test_other_context_changes_replace_state() {
        let medium = MemoryBackend::new();
        let (mut tab_a, _) = manager_on(&medium);
        let (mut tab_b, _) = manager_on(&medium);

        tab_a.dispatch(minutes_goal(Category::Speaking, 10.0)).unwrap();
        assert!(tab_b.state().goals.is_empty());

        assert!(tab_b.sync());
        assert_eq!(tab_b.state(), tab_a.state());

        // Own writes are not echoed back
        assert!(!tab_a.sync());
    }

    #[test]
    fn test_rejected_intent_leaves_state_unchanged() {
        let medium = MemoryBackend::new();
        let (mut manager, _) = manager_on(&medium);
        let before = manager.state().clone();

        let err = manager
            .dispatch(Intent::CompleteItem {
                roadmap_id: RoadmapId::from("nope"),
                item_id: ItemId::from("nope"),
            })
            .unwrap_err();
        assert!(matches!(
            err,
            TrackerError::Engine(EngineError::NotFound {
                kind: EntityKind::Roadmap,
                ..
            })
        ));
        assert_eq!(manager.state(), &before);
    }

    #[test]
    fn test_malformed_document_loads_as_default() {
        let medium = MemoryBackend::new();
        let writer = MemoryStore::new(medium.clone());
        writer.set("userGoals:learner", &json!({"roadmaps": "not a list"}));

        let (manager, _) = manager_on(&medium);
        assert_eq!(manager.state(), &UserGoals::default());
    }

    #[test]
    fn test_unparsable_or_removed_external_value_is_ignored() {
        let medium = MemoryBackend::new();
        let (mut manager, _) = manager_on(&medium);
        manager.dispatch(minutes_goal(Category::Grammar, 5.0)).unwrap();
        let before = manager.state().clone();

        let other = MemoryStore::new(medium.clone());
        other.set("userGoals:learner", &json!({"goals": 42}));
        assert!(!manager.sync());
        other.remove("userGoals:learner");
        assert!(!manager.sync());
        assert_eq!(manager.state(), &before);
    }

    #[test]
    fn test_added_item_gets_fresh_id_and_time() {
        let medium = MemoryBackend::new();
        let (mut manager, clock) = manager_on(&medium);
        manager
            .dispatch(Intent::AddRoadmap(RoadmapDraft {
                title: "Grammar basics".to_string(),
                goal: String::new(),
                category: Category::Grammar,
                weekly_time: 90,
                items: Vec::new(),
            }))
            .unwrap();
        let roadmap_id = manager.state().roadmaps[0].id.clone();

        clock.advance(Duration::hours(1));
        manager
            .dispatch(Intent::AddItem {
                roadmap_id: roadmap_id.clone(),
                draft: ItemDraft {
                    item_type: ItemType::Quiz,
                    title: "Articles quiz".to_string(),
                    priority: Priority::High,
                    estimated_time: Some(15),
                },
            })
            .unwrap();

        let roadmap = manager.state().roadmap(&roadmap_id).unwrap();
        assert_eq!(roadmap.items().len(), 1);
        assert_eq!(roadmap.items()[0].date_added, t0() + Duration::hours(1));
        assert_eq!(roadmap.date_updated(), t0() + Duration::hours(1));
    }

    #[test]
    fn test_start_session_requires_runtime() {
        let medium = MemoryBackend::new();
        let (mut manager, _) = manager_on(&medium);
        let err = manager
            .dispatch(Intent::StartSession {
                duration_secs: 60,
                category: Category::General,
            })
            .unwrap_err();
        assert!(matches!(err, TrackerError::Timer(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_completed_session_records_activity() {
        let medium = MemoryBackend::new();
        let (mut manager, _) = manager_on(&medium);
        manager.dispatch(minutes_goal(Category::Listening, 10.0)).unwrap();

        manager
            .dispatch(Intent::StartSession {
                duration_secs: 120,
                category: Category::Listening,
            })
            .unwrap();
        tokio::time::sleep(StdDuration::from_secs(121)).await;

        assert!(manager.sync());
        assert_eq!(manager.state().goals[0].progress(), 2.0);
        assert_eq!(manager.state().streak_days, 1);
        assert_eq!(manager.session_snapshot().map(|s| s.state), Some(crate::session::TimerState::Completed));
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_is_stamped_with_its_end_not_the_sync_time() {
        let medium = MemoryBackend::new();
        let (mut manager, clock) = manager_on(&medium);
        let evening = Utc.with_ymd_and_hms(2024, 9, 2, 22, 0, 0).unwrap();
        clock.set(evening);

        manager
            .dispatch(Intent::StartSession {
                duration_secs: 120,
                category: Category::Reading,
            })
            .unwrap();
        tokio::time::sleep(StdDuration::from_secs(121)).await;

        // Nobody syncs until after midnight
        clock.set(evening + Duration::hours(3));
        assert!(manager.sync());
        assert_eq!(manager.state().last_activity, Some(evening + Duration::minutes(2)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_session_cancels_running_one() {
        let medium = MemoryBackend::new();
        let (mut manager, _) = manager_on(&medium);
        manager.dispatch(minutes_goal(Category::Writing, 10.0)).unwrap();

        let start = |secs| Intent::StartSession {
            duration_secs: secs,
            category: Category::Writing,
        };
        manager.dispatch(start(60)).unwrap();
        tokio::time::sleep(StdDuration::from_secs(30)).await;
        manager.dispatch(start(180)).unwrap();

        tokio::time::sleep(StdDuration::from_secs(60)).await;
        assert!(!manager.sync());
        assert_eq!(manager.state().goals[0].progress(), 0.0);

        tokio::time::sleep(StdDuration::from_secs(121)).await;
        assert!(manager.sync());
        assert_eq!(manager.state().goals[0].progress(), 3.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_session_records_nothing() {
        let medium = MemoryBackend::new();
        let (mut manager, _) = manager_on(&medium);
        manager.dispatch(minutes_goal(Category::Vocabulary, 10.0)).unwrap();
        manager
            .dispatch(Intent::StartSession {
                duration_secs: 5,
                category: Category::Vocabulary,
            })
            .unwrap();
        manager.dispatch(Intent::CancelSession).unwrap();

        tokio::time::sleep(StdDuration::from_secs(10)).await;
        assert!(!manager.sync());
        assert!(manager.session_snapshot().is_none());
        assert_eq!(manager.state().last_activity, None);
    }
}
