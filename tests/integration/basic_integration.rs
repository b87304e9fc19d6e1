/// Basic integration tests over a SQLite-backed state manager
use chrono::{DateTime, Duration, TimeZone, Utc};
use learning_tracker::*;
use serde_json::json;
use tempfile::NamedTempFile;

#[cfg(test)]
mod basic_integration_tests {
    use super::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 1, 8, 0, 0).unwrap()
    }

    fn open_manager(file: &NamedTempFile, clock: &ManualClock) -> StateManager<SqliteStore> {
        let store = SqliteStore::open(file.path()).expect("Failed to open store");
        StateManager::open(store, TrackerConfig::for_user(UserId::from("ana"))).with_clock(clock.clone())
    }

    fn listening_roadmap() -> RoadmapDraft {
        RoadmapDraft {
            title: "Podcast listening".to_string(),
            goal: "Follow a news podcast without subtitles".to_string(),
            category: Category::Listening,
            weekly_time: 120,
            items: ["Intro episode", "Shadowing", "Dictation", "Full episode"]
                .iter()
                .map(|title| ItemDraft {
                    item_type: ItemType::Video,
                    title: title.to_string(),
                    priority: Priority::Medium,
                    estimated_time: Some(30),
                })
                .collect(),
        }
    }

    #[test]
    fn test_roadmap_end_to_end() {
        let file = NamedTempFile::new().expect("Failed to create temp file");
        let clock = ManualClock::new(t0());
        let mut manager = open_manager(&file, &clock);

        let view = manager.dispatch(Intent::AddRoadmap(listening_roadmap())).unwrap();
        assert_eq!(view.roadmaps[0].progress, 0);
        let roadmap_id = view.roadmaps[0].id.clone();
        let items: Vec<ItemId> = manager.state().roadmaps[0]
            .items()
            .iter()
            .map(|i| i.id.clone())
            .collect();

        clock.advance(Duration::days(1));
        let view = manager
            .dispatch(Intent::CompleteItem {
                roadmap_id: roadmap_id.clone(),
                item_id: items[0].clone(),
            })
            .unwrap();
        assert_eq!(view.roadmaps[0].progress, 25);
        assert_eq!(view.roadmaps[0].completed_items, 1);

        for item in &items[1..] {
            clock.advance(Duration::hours(6));
            manager
                .dispatch(Intent::CompleteItem {
                    roadmap_id: roadmap_id.clone(),
                    item_id: item.clone(),
                })
                .unwrap();
        }
        let view = manager.view();
        assert_eq!(view.roadmaps[0].progress, 100);
        assert!(view.roadmaps[0].estimated_completion_date.is_some());
        assert!(view.badges.contains(&"roadmap-finisher".to_string()));

        // Unknown goal ids are not an error
        let before = manager.state().clone();
        manager.dispatch(Intent::DeleteGoal(GoalId::from("no-such-goal"))).unwrap();
        assert_eq!(manager.state(), &before);
    }

    #[test]
    fn test_state_survives_reopen() {
        let file = NamedTempFile::new().expect("Failed to create temp file");
        let clock = ManualClock::new(t0());
        {
            let mut manager = open_manager(&file, &clock);
            manager
                .dispatch(Intent::AddGoal(GoalDraft {
                    name: "Write 4 letters".to_string(),
                    category: Category::Writing,
                    target: 4.0,
                    unit: "letters".to_string(),
                    deadline: Some(t0() + Duration::days(30)),
                }))
                .unwrap();
            manager
                .dispatch(Intent::RecordActivity {
                    category: Category::Writing,
                    amount: 3.0,
                })
                .unwrap();
        }

        let manager = open_manager(&file, &clock);
        let view = manager.view();
        assert_eq!(view.goals.len(), 1);
        assert_eq!(view.goals[0].progress, 3.0);
        assert_eq!(view.goals[0].percent, 75.0);
        assert_eq!(view.streak_days, 1);
        assert!(view.streak_alive);
    }

    #[test]
    fn test_malformed_document_falls_back_to_default() {
        let file = NamedTempFile::new().expect("Failed to create temp file");
        {
            let store = SqliteStore::open(file.path()).unwrap();
            store.set("userGoals:ana", &json!({"goals": [{"id": 7}]}));
        }

        let clock = ManualClock::new(t0());
        let mut manager = open_manager(&file, &clock);
        assert_eq!(manager.state(), &UserGoals::default());

        // The next write replaces the broken document
        manager
            .dispatch(Intent::RecordActivity {
                category: Category::General,
                amount: 1.0,
            })
            .unwrap();
        let stored = manager.store().get("userGoals:ana").unwrap();
        assert_eq!(stored["streakDays"], 1);
    }

    #[test]
    fn test_unknown_fields_are_preserved() {
        let file = NamedTempFile::new().expect("Failed to create temp file");
        {
            let store = SqliteStore::open(file.path()).unwrap();
            store.set(
                "userGoals:ana",
                &json!({
                    "goals": [],
                    "roadmaps": [{
                        "id": "r1",
                        "title": "Grammar",
                        "category": "grammar",
                        "items": [{
                            "id": "i1",
                            "type": "exercise",
                            "title": "Cases",
                            "completed": false,
                            "dateAdded": "2024-03-01T00:00:00Z",
                            "color": "red"
                        }],
                        "dateCreated": "2024-03-01T00:00:00Z",
                        "dateUpdated": "2024-03-01T00:00:00Z",
                        "pinned": true
                    }],
                    "badges": [],
                    "streakDays": 0,
                    "theme": "dark"
                }),
            );
        }

        let clock = ManualClock::new(t0());
        let mut manager = open_manager(&file, &clock);
        manager
            .dispatch(Intent::CompleteItem {
                roadmap_id: RoadmapId::from("r1"),
                item_id: ItemId::from("i1"),
            })
            .unwrap();

        let stored = manager.store().get("userGoals:ana").unwrap();
        assert_eq!(stored["theme"], "dark");
        assert_eq!(stored["roadmaps"][0]["pinned"], true);
        assert_eq!(stored["roadmaps"][0]["items"][0]["color"], "red");
        assert_eq!(stored["roadmaps"][0]["progress"], 100);
    }

    #[test]
    fn test_backup_receives_every_change() {
        let file = NamedTempFile::new().expect("Failed to create temp file");
        let backup_dir = tempfile::tempdir().unwrap();
        let clock = ManualClock::new(t0());
        let mut manager = open_manager(&file, &clock).with_backup(JsonFileBackup::new(backup_dir.path()));

        manager
            .dispatch(Intent::RecordActivity {
                category: Category::Speaking,
                amount: 15.0,
            })
            .unwrap();

        let backup = JsonFileBackup::new(backup_dir.path());
        let copy = backup.fetch(&UserId::from("ana")).unwrap().unwrap();
        assert_eq!(&copy, manager.state());
    }

    #[test]
    fn test_unreachable_backup_does_not_fail_dispatch() {
        let file = NamedTempFile::new().expect("Failed to create temp file");
        // A file where the backup directory should be makes every push fail
        let blocker = NamedTempFile::new().unwrap();
        let clock = ManualClock::new(t0());
        let mut manager = open_manager(&file, &clock).with_backup(JsonFileBackup::new(blocker.path()));

        let view = manager
            .dispatch(Intent::RecordActivity {
                category: Category::Reading,
                amount: 5.0,
            })
            .unwrap();
        assert_eq!(view.streak_days, 1);
    }
}
