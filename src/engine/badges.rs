/// Badge rules
///
/// Badges are derived from fixed thresholds. Once earned a badge is never
/// removed, even if the condition stops holding (e.g. a streak breaks).

use crate::domain::UserGoals;

/// A single badge and the condition that unlocks it
pub struct BadgeRule {
    pub id: &'static str,
    pub description: &'static str,
    earned: fn(&UserGoals) -> bool,
}

impl BadgeRule {
    pub fn is_earned(&self, state: &UserGoals) -> bool {
        (self.earned)(state)
    }
}

pub const BADGE_RULES: &[BadgeRule] = &[
    BadgeRule {
        id: "first-step",
        description: "Recorded your first learning activity",
        earned: has_any_activity,
    },
    BadgeRule {
        id: "streak-3",
        description: "Three days in a row",
        earned: streak_3,
    },
    BadgeRule {
        id: "streak-7",
        description: "A full week without a break",
        earned: streak_7,
    },
    BadgeRule {
        id: "streak-30",
        description: "Thirty days in a row",
        earned: streak_30,
    },
    BadgeRule {
        id: "goal-getter",
        description: "Completed a goal",
        earned: one_goal,
    },
    BadgeRule {
        id: "overachiever",
        description: "Completed five goals",
        earned: five_goals,
    },
    BadgeRule {
        id: "roadmap-finisher",
        description: "Finished every item of a roadmap",
        earned: finished_roadmap,
    },
    BadgeRule {
        id: "busy-learner",
        description: "Completed ten roadmap items",
        earned: ten_items,
    },
];

fn has_any_activity(state: &UserGoals) -> bool {
    state.last_activity.is_some()
}

fn streak_3(state: &UserGoals) -> bool {
    state.streak_days >= 3
}

fn streak_7(state: &UserGoals) -> bool {
    state.streak_days >= 7
}

fn streak_30(state: &UserGoals) -> bool {
    state.streak_days >= 30
}

fn one_goal(state: &UserGoals) -> bool {
    state.completed_goals() >= 1
}

fn five_goals(state: &UserGoals) -> bool {
    state.completed_goals() >= 5
}

fn finished_roadmap(state: &UserGoals) -> bool {
    state
        .roadmaps
        .iter()
        .any(|r| !r.items().is_empty() && r.progress() == 100)
}

fn ten_items(state: &UserGoals) -> bool {
    state.completed_items() >= 10
}

/// Add every newly earned badge to the state
pub fn evaluate_badges(state: &UserGoals) -> UserGoals {
    let mut next = state.clone();
    for rule in BADGE_RULES {
        if rule.is_earned(state) && next.badges.insert(rule.id.to_string()) {
            tracing::info!("Badge unlocked: {} ({})", rule.id, rule.description);
        }
    }
    next
}
