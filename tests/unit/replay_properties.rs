/// Property tests for engine replay
use chrono::{DateTime, Duration, TimeZone, Utc};
use learning_tracker::*;
use proptest::prelude::*;

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap()
}

fn arb_category() -> impl Strategy<Value = Category> {
    prop_oneof![
        Just(Category::Vocabulary),
        Just(Category::Grammar),
        Just(Category::Speaking),
        Just(Category::Reading),
        Just(Category::General),
    ]
}

fn goal_id(n: u8) -> GoalId {
    GoalId::from(format!("goal-{}", n))
}

fn roadmap_id(n: u8) -> RoadmapId {
    RoadmapId::from(format!("roadmap-{}", n))
}

/// Actions over a small id pool so that transitions collide often
fn arb_action() -> impl Strategy<Value = Action> {
    let hours = 0i64..24 * 40;
    prop_oneof![
        (0u8..3, arb_category(), 1.0f64..50.0).prop_map(|(n, category, target)| Action::AddGoal {
            id: goal_id(n),
            draft: GoalDraft {
                name: format!("Goal {}", n),
                category,
                target,
                unit: "minutes".to_string(),
                deadline: None,
            },
        }),
        (0u8..3).prop_map(|n| Action::DeleteGoal { id: goal_id(n) }),
        (0u8..3).prop_map(|n| Action::ResetGoal { id: goal_id(n) }),
        (0u8..2, arb_category(), 0usize..5, hours.clone()).prop_map(|(n, category, items, h)| {
            Action::AddRoadmap {
                id: roadmap_id(n),
                draft: RoadmapDraft {
                    title: format!("Roadmap {}", n),
                    goal: String::new(),
                    category,
                    weekly_time: 60,
                    items: (0..items)
                        .map(|i| ItemDraft {
                            item_type: ItemType::Exercise,
                            title: format!("Step {}", i),
                            priority: Priority::Low,
                            estimated_time: None,
                        })
                        .collect(),
                },
                at: base_time() + Duration::hours(h),
            }
        }),
        (0u8..2).prop_map(|n| Action::DeleteRoadmap { id: roadmap_id(n) }),
        (0u8..2, 0usize..5, hours.clone()).prop_map(|(n, i, h)| Action::CompleteItem {
            roadmap_id: roadmap_id(n),
            item_id: ItemId::derived(&roadmap_id(n), i),
            at: base_time() + Duration::hours(h),
        }),
        (0u8..2, 0usize..5, hours.clone()).prop_map(|(n, i, h)| Action::UncompleteItem {
            roadmap_id: roadmap_id(n),
            item_id: ItemId::derived(&roadmap_id(n), i),
            at: base_time() + Duration::hours(h),
        }),
        (arb_category(), 0.0f64..30.0, hours).prop_map(|(category, amount, h)| {
            Action::RecordActivity {
                category,
                amount,
                at: base_time() + Duration::hours(h),
            }
        }),
    ]
}

proptest! {
    // Property: two independent replays of one log agree
    #[test]
    fn prop_replay_is_deterministic(log in prop::collection::vec(arb_action(), 0..40)) {
        let first = replay(&UserGoals::default(), &log);
        let second = replay(&UserGoals::default(), &log);
        prop_assert_eq!(first, second);
    }

    // Property: derived fields hold after any sequence of actions
    #[test]
    fn prop_derived_fields_stay_consistent(log in prop::collection::vec(arb_action(), 0..40)) {
        let state = replay(&UserGoals::default(), &log);

        for goal in &state.goals {
            prop_assert_eq!(goal.is_completed(), goal.progress() >= goal.target());
        }
        for roadmap in &state.roadmaps {
            let total = roadmap.items().len();
            let expected = if total == 0 {
                0
            } else {
                ((roadmap.completed_count() as f64 * 100.0) / total as f64).round() as u8
            };
            prop_assert_eq!(roadmap.progress(), expected);
            for item in roadmap.items() {
                prop_assert_eq!(item.is_completed(), item.date_completed().is_some());
            }
        }
    }
}
