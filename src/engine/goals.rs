/// Goal transitions and activity recording

use chrono::{DateTime, Utc};

use crate::domain::{Category, Goal, GoalDraft, GoalId, UserGoals};
use crate::engine::streak::advance_streak;
use crate::engine::{EngineError, EntityKind};

pub fn add_goal(state: &UserGoals, id: &GoalId, draft: GoalDraft) -> Result<UserGoals, EngineError> {
    if state.goal(id).is_some() {
        return Err(EngineError::InvalidInput(format!("goal {} already exists", id)));
    }

    let goal = Goal::new(id.clone(), draft)?;
    let mut next = state.clone();
    next.goals.push(goal);
    Ok(next)
}

/// Remove a goal; deleting an unknown id is a no-op so retries are safe
pub fn delete_goal(state: &UserGoals, id: &GoalId) -> UserGoals {
    let mut next = state.clone();
    let before = next.goals.len();
    next.goals.retain(|g| &g.id != id);
    if next.goals.len() == before {
        tracing::debug!("Goal {} not present, nothing to delete", id);
    }
    next
}

/// Reset a goal's progress to zero
pub fn reset_goal(state: &UserGoals, id: &GoalId) -> Result<UserGoals, EngineError> {
    let mut next = state.clone();
    next.goal_mut(id)
        .ok_or_else(|| EngineError::not_found(EntityKind::Goal, id.as_str()))?
        .reset();
    Ok(next)
}

/// Apply `amount` of activity in `category` at `at`
///
/// Every goal in the category gains `amount`; the streak and `lastActivity`
/// are advanced regardless of whether any goal matched.
pub fn record_activity(
    state: &UserGoals,
    category: Category,
    amount: f64,
    at: DateTime<Utc>,
) -> Result<UserGoals, EngineError> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(EngineError::InvalidInput(format!(
            "activity amount must be a non-negative number, got {}",
            amount
        )));
    }

    let mut next = state.clone();
    for goal in next.goals.iter_mut().filter(|g| g.category == category) {
        goal.add_progress(amount)?;
    }

    let streak = advance_streak(next.streak_days, next.last_activity, at);
    next.streak_days = streak.streak_days;
    next.last_activity = Some(streak.last_activity);

    tracing::debug!(
        "Recorded {} of {} activity, streak is {} day(s)",
        amount,
        category.display_name(),
        next.streak_days
    );
    Ok(next)
}
