/// Several execution contexts over one database file
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use learning_tracker::storage::StorageEvent;
use learning_tracker::*;
use serde_json::json;
use tempfile::NamedTempFile;
use tokio_test::assert_ok;

fn goal(name: &str, category: Category) -> Intent {
    Intent::AddGoal(GoalDraft {
        name: name.to_string(),
        category,
        target: 20.0,
        unit: "minutes".to_string(),
        deadline: None,
    })
}

fn open_tab(file: &NamedTempFile, user: &str) -> StateManager<SqliteStore> {
    let store = SqliteStore::open(file.path()).expect("Failed to open store");
    StateManager::open(store, TrackerConfig::for_user(UserId::from(user)))
}

#[test]
fn test_change_in_one_tab_reaches_the_other() {
    let file = NamedTempFile::new().expect("Failed to create temp file");
    let mut tab_a = open_tab(&file, "ana");
    let mut tab_b = open_tab(&file, "ana");

    assert_ok!(tab_a.dispatch(goal("Daily grammar", Category::Grammar)));
    assert!(tab_b.state().goals.is_empty());

    assert!(tab_b.sync());
    assert_eq!(tab_b.state(), tab_a.state());

    // The writer never hears its own change
    assert!(!tab_a.sync());
}

#[test]
fn test_dispatch_builds_on_the_latest_foreign_state() {
    let file = NamedTempFile::new().expect("Failed to create temp file");
    let mut tab_a = open_tab(&file, "ana");
    let mut tab_b = open_tab(&file, "ana");

    assert_ok!(tab_a.dispatch(goal("Read", Category::Reading)));
    let view = assert_ok!(tab_b.dispatch(goal("Speak", Category::Speaking)));
    assert_eq!(view.goals.len(), 2);

    assert!(tab_a.sync());
    assert_eq!(tab_a.state().goals.len(), 2);
}

#[test]
fn test_users_on_one_device_are_isolated() {
    let file = NamedTempFile::new().expect("Failed to create temp file");
    let mut ana = open_tab(&file, "ana");
    let mut ben = open_tab(&file, "ben");

    assert_ok!(ana.dispatch(goal("Listen", Category::Listening)));
    assert!(!ben.sync());
    assert!(ben.state().goals.is_empty());
}

#[test]
fn test_store_subscription_ends_on_drop() {
    let file = NamedTempFile::new().expect("Failed to create temp file");
    let writer = SqliteStore::open(file.path()).unwrap();
    let reader = SqliteStore::open(file.path()).unwrap();

    let seen: Rc<RefCell<Vec<StorageEvent>>> = Rc::default();
    let sink = seen.clone();
    let subscription = reader.subscribe("settings", Box::new(move |e| sink.borrow_mut().push(e.clone())));

    writer.set("settings", &json!({"dailyReminder": true}));
    reader.poll_changes();
    assert_eq!(seen.borrow().len(), 1);

    drop(subscription);
    assert_eq!(reader.subscription_count(), 0);
    writer.set("settings", &json!({"dailyReminder": false}));
    let events = reader.poll_changes();
    assert_eq!(events.len(), 1);
    assert_eq!(seen.borrow().len(), 1);
    assert_eq!(reader.get("settings"), Some(json!({"dailyReminder": false})));
}

#[tokio::test(start_paused = true)]
async fn test_session_completion_is_shared_with_other_tabs() {
    let file = NamedTempFile::new().expect("Failed to create temp file");
    let mut timer_tab = open_tab(&file, "ana");
    let mut other_tab = open_tab(&file, "ana");

    assert_ok!(timer_tab.dispatch(goal("Vocabulary minutes", Category::Vocabulary)));
    assert_ok!(timer_tab.dispatch(Intent::StartSession {
        duration_secs: 300,
        category: Category::Vocabulary,
    }));

    tokio::time::sleep(Duration::from_millis(150_500)).await;
    let snapshot = timer_tab.session_snapshot().unwrap();
    assert_eq!(snapshot.state, TimerState::Running);
    assert_eq!(snapshot.time_remaining, 150);

    tokio::time::sleep(Duration::from_secs(151)).await;
    assert!(timer_tab.sync());
    assert_eq!(timer_tab.state().goals[0].progress(), 5.0);

    assert!(other_tab.sync());
    assert_eq!(other_tab.state().goals[0].progress(), 5.0);
    assert!(other_tab.view().badges.contains(&"first-step".to_string()));
}
