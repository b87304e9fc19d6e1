/// Derived view handed to the rendering layer after every intent

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::domain::{Category, GoalId, RoadmapId, UserGoals};
use crate::engine::is_streak_alive;
use crate::session::TimerSnapshot;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoadmapSummary {
    pub id: RoadmapId,
    pub title: String,
    pub category: Category,
    pub progress: u8,
    pub completed_items: usize,
    pub total_items: usize,
    pub estimated_completion_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalSummary {
    pub id: GoalId,
    pub name: String,
    pub category: Category,
    pub progress: f64,
    pub target: f64,
    pub unit: String,
    /// Completion percentage capped at 100
    pub percent: f64,
    pub completed: bool,
    pub deadline: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressView {
    pub roadmaps: Vec<RoadmapSummary>,
    pub goals: Vec<GoalSummary>,
    pub streak_days: u32,
    /// False once a full calendar day has passed without activity
    pub streak_alive: bool,
    pub badges: Vec<String>,
    pub last_activity: Option<DateTime<Utc>>,
    pub session: Option<TimerSnapshot>,
}

impl ProgressView {
    pub fn build(state: &UserGoals, session: Option<TimerSnapshot>, today: NaiveDate) -> Self {
        let roadmaps = state
            .roadmaps
            .iter()
            .map(|r| RoadmapSummary {
                id: r.id.clone(),
                title: r.title.clone(),
                category: r.category,
                progress: r.progress(),
                completed_items: r.completed_count(),
                total_items: r.items().len(),
                estimated_completion_date: r.estimated_completion_date(),
            })
            .collect();

        let goals = state
            .goals
            .iter()
            .map(|g| GoalSummary {
                id: g.id.clone(),
                name: g.name.clone(),
                category: g.category,
                progress: g.progress(),
                target: g.target(),
                unit: g.unit.clone(),
                percent: g.percent(),
                completed: g.is_completed(),
                deadline: g.deadline,
            })
            .collect();

        Self {
            roadmaps,
            goals,
            streak_days: state.streak_days,
            streak_alive: is_streak_alive(state.last_activity, today),
            badges: state.badges.iter().cloned().collect(),
            last_activity: state.last_activity,
            session,
        }
    }
}
