/// Basic unit tests over the public engine and timer API
use chrono::{DateTime, Duration, TimeZone, Utc};
use learning_tracker::engine::{
    add_goal, add_roadmap, complete_item, delete_goal, record_activity,
};
use learning_tracker::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[cfg(test)]
mod basic_unit_tests {
    use super::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 19, 0, 0).unwrap()
    }

    fn draft(items: usize) -> RoadmapDraft {
        RoadmapDraft {
            title: "Vocabulary sprint".to_string(),
            goal: "Learn the 100 most common verbs".to_string(),
            category: Category::Vocabulary,
            weekly_time: 150,
            items: (0..items)
                .map(|i| ItemDraft {
                    item_type: ItemType::Flashcard,
                    title: format!("Deck {}", i + 1),
                    priority: Priority::Medium,
                    estimated_time: Some(10),
                })
                .collect(),
        }
    }

    #[test]
    fn test_progress_is_recomputed_after_every_completion() {
        let id = RoadmapId::from("verbs");
        let mut state = add_roadmap(&UserGoals::default(), &id, draft(3), t0()).unwrap();

        for (n, day) in (0..3).zip(1i64..) {
            let item = ItemId::derived(&id, n);
            state = complete_item(&state, &id, &item, t0() + Duration::days(day)).unwrap();
            let roadmap = state.roadmap(&id).unwrap();
            let expected = ((roadmap.completed_count() as f64 * 100.0) / 3.0).round() as u8;
            assert_eq!(roadmap.progress(), expected);
        }
        assert_eq!(state.roadmap(&id).unwrap().progress(), 100);
    }

    #[test]
    fn test_empty_roadmap_has_zero_progress() {
        let id = RoadmapId::from("empty");
        let state = add_roadmap(&UserGoals::default(), &id, draft(0), t0()).unwrap();
        let roadmap = state.roadmap(&id).unwrap();
        assert_eq!(roadmap.progress(), 0);
        assert_eq!(roadmap.estimated_completion_date(), None);
    }

    #[test]
    fn test_goal_completion_follows_progress() {
        let goal_id = GoalId::from("g");
        let mut state = add_goal(
            &UserGoals::default(),
            &goal_id,
            GoalDraft {
                name: "Read 60 minutes".to_string(),
                category: Category::Reading,
                target: 60.0,
                unit: "minutes".to_string(),
                deadline: None,
            },
        )
        .unwrap();

        for (i, amount) in [20.0, 0.0, 25.0, 15.0, 5.0].into_iter().enumerate() {
            state = record_activity(&state, Category::Reading, amount, t0() + Duration::hours(i as i64)).unwrap();
            let goal = state.goal(&goal_id).unwrap();
            assert_eq!(goal.is_completed(), goal.progress() >= goal.target());
        }
        assert!(state.goal(&goal_id).unwrap().is_completed());
        assert_eq!(state.goal(&goal_id).unwrap().percent(), 100.0);
    }

    #[test]
    fn test_delete_goal_is_idempotent() {
        let state = add_goal(
            &UserGoals::default(),
            &GoalId::from("g"),
            GoalDraft {
                name: "Speak".to_string(),
                category: Category::Speaking,
                target: 10.0,
                unit: "minutes".to_string(),
                deadline: None,
            },
        )
        .unwrap();

        let once = delete_goal(&state, &GoalId::from("g"));
        let twice = delete_goal(&once, &GoalId::from("g"));
        assert_eq!(once, twice);
        assert_eq!(delete_goal(&state, &GoalId::from("missing")), state);
    }

    #[test]
    fn test_streak_law() {
        let mut state = UserGoals::default();
        for day in 0..4 {
            state = record_activity(&state, Category::General, 1.0, t0() + Duration::days(day)).unwrap();
            assert_eq!(state.streak_days, day as u32 + 1);
        }

        // Same day repeat
        state = record_activity(&state, Category::General, 1.0, t0() + Duration::days(3) + Duration::hours(2)).unwrap();
        assert_eq!(state.streak_days, 4);

        // Two-day gap resets
        state = record_activity(&state, Category::General, 1.0, t0() + Duration::days(6)).unwrap();
        assert_eq!(state.streak_days, 1);
    }

    #[test]
    fn test_timer_completes_once_after_120_ticks() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut timer = SessionTimer::new(120)
            .unwrap()
            .with_completion(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        timer.start().unwrap();

        let mut completions = 0;
        let mut previous = timer.state();
        for _ in 0..120 {
            let state = timer.tick();
            if previous == TimerState::Running && state == TimerState::Completed {
                completions += 1;
            }
            previous = state;
        }

        assert_eq!(completions, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(timer.time_remaining(), 0);
    }

    #[test]
    fn test_negative_duration_is_rejected() {
        assert_eq!(
            SessionTimer::new(-1).err(),
            Some(TimerError::InvalidDuration(-1))
        );
    }
}
