/// The persisted root of a user's progress
///
/// `UserGoals` is the single unit of persistence: it is always loaded and saved
/// as one document, never partially.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::{lenient_count, Goal, GoalId, Roadmap, RoadmapId};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserGoals {
    #[serde(default)]
    pub goals: Vec<Goal>,
    #[serde(default)]
    pub roadmaps: Vec<Roadmap>,
    /// Earned badge ids; kept sorted so serialization is deterministic
    #[serde(default)]
    pub badges: BTreeSet<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub streak_days: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_activity: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserGoals {
    /// Parse a stored document and recompute its derived fields
    ///
    /// A document that still breaks an invariant after normalization is
    /// rejected like any other malformed document.
    pub fn from_json_value(value: Value) -> Result<Self, serde_json::Error> {
        let mut state: UserGoals = serde_json::from_value(value)?;
        state.normalize();
        state.check_invariants().map_err(serde::de::Error::custom)?;
        Ok(state)
    }

    pub fn goal(&self, id: &GoalId) -> Option<&Goal> {
        self.goals.iter().find(|g| &g.id == id)
    }

    pub(crate) fn goal_mut(&mut self, id: &GoalId) -> Option<&mut Goal> {
        self.goals.iter_mut().find(|g| &g.id == id)
    }

    pub fn roadmap(&self, id: &RoadmapId) -> Option<&Roadmap> {
        self.roadmaps.iter().find(|r| &r.id == id)
    }

    pub(crate) fn roadmap_mut(&mut self, id: &RoadmapId) -> Option<&mut Roadmap> {
        self.roadmaps.iter_mut().find(|r| &r.id == id)
    }

    pub fn completed_goals(&self) -> usize {
        self.goals.iter().filter(|g| g.is_completed()).count()
    }

    pub fn completed_items(&self) -> usize {
        self.roadmaps.iter().map(|r| r.completed_count()).sum()
    }

    /// Bring derived fields in line with the stored source fields
    ///
    /// Documents can be hand-edited or written by older clients, so nothing
    /// derived is trusted on load.
    pub fn normalize(&mut self) {
        self.goals.retain(|goal| {
            let usable = goal.has_valid_target();
            if !usable {
                tracing::warn!("Dropping goal {} with unusable target {}", goal.id, goal.target());
            }
            usable
        });
        for goal in &mut self.goals {
            goal.normalize();
        }
        for roadmap in &mut self.roadmaps {
            roadmap.normalize();
        }
        if self.last_activity.is_none() {
            self.streak_days = 0;
        }
    }

    /// Check every structural invariant of the model
    pub fn check_invariants(&self) -> Result<(), String> {
        for goal in &self.goals {
            goal.check_invariants()?;
        }
        for roadmap in &self.roadmaps {
            roadmap.check_invariants()?;
        }
        if self.last_activity.is_none() && self.streak_days != 0 {
            return Err("streak recorded without any activity".to_string());
        }
        Ok(())
    }
}
