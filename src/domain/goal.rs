/// Goal entity and related functionality
///
/// A goal is a quantified target (e.g. "learn 500 words") that accumulates
/// progress from recorded activity. Its `completed` flag is derived from
/// `progress` and `target` and has no independent setter.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::{Category, DomainError, GoalId};

/// A quantified learning target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    /// Unique identifier for this goal
    pub id: GoalId,
    /// Display name (e.g., "Learn 500 words")
    pub name: String,
    /// Learning area that feeds this goal
    pub category: Category,
    /// Accumulated progress in `unit`
    progress: f64,
    /// Amount of progress needed to complete the goal
    target: f64,
    /// Unit of progress (e.g., "words", "minutes")
    pub unit: String,
    /// Optional deadline
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    completed: bool,
    /// Fields written by other clients that this crate does not know about
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// User-supplied fields for a new goal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalDraft {
    pub name: String,
    pub category: Category,
    pub target: f64,
    pub unit: String,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
}

impl Goal {
    /// Create a new goal with zero progress
    ///
    /// Rejects empty names and non-positive or non-finite targets.
    pub fn new(id: GoalId, draft: GoalDraft) -> Result<Self, DomainError> {
        Self::validate_name(&draft.name)?;
        Self::validate_target(draft.target)?;

        Ok(Self {
            id,
            name: draft.name.trim().to_string(),
            category: draft.category,
            progress: 0.0,
            target: draft.target,
            unit: draft.unit.trim().to_string(),
            deadline: draft.deadline,
            completed: false,
            extra: Map::new(),
        })
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn target(&self) -> f64 {
        self.target
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Add non-negative progress and recompute completion
    pub fn add_progress(&mut self, amount: f64) -> Result<(), DomainError> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(DomainError::InvalidInput(format!(
                "activity amount must be a non-negative number, got {}",
                amount
            )));
        }
        self.progress += amount;
        self.refresh_completion();
        Ok(())
    }

    /// Explicit reset, the only way progress goes down
    pub fn reset(&mut self) {
        self.progress = 0.0;
        self.refresh_completion();
    }

    /// Completion percentage for display, capped at 100
    pub fn percent(&self) -> f64 {
        if self.target <= 0.0 {
            return 0.0;
        }
        (self.progress / self.target * 100.0).min(100.0)
    }

    /// Recompute derived fields after loading from storage
    pub(crate) fn normalize(&mut self) {
        if !self.progress.is_finite() || self.progress < 0.0 {
            self.progress = 0.0;
        }
        self.refresh_completion();
    }

    /// A target that no amount of progress can meaningfully reach is unusable
    pub(crate) fn has_valid_target(&self) -> bool {
        self.target.is_finite() && self.target > 0.0
    }

    /// Whether the stored fields satisfy the goal invariants
    pub(crate) fn check_invariants(&self) -> Result<(), String> {
        if !self.has_valid_target() {
            return Err(format!("goal {} has non-positive target {}", self.id, self.target));
        }
        if self.completed != (self.progress >= self.target) {
            return Err(format!("goal {} completion flag is inconsistent", self.id));
        }
        Ok(())
    }

    fn refresh_completion(&mut self) {
        self.completed = self.target > 0.0 && self.progress >= self.target;
    }

    fn validate_name(name: &str) -> Result<(), DomainError> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(DomainError::InvalidInput("goal name cannot be empty".to_string()));
        }
        if trimmed.len() > 100 {
            return Err(DomainError::InvalidInput(
                "goal name cannot be longer than 100 characters".to_string(),
            ));
        }
        Ok(())
    }

    fn validate_target(target: f64) -> Result<(), DomainError> {
        if !target.is_finite() || target <= 0.0 {
            return Err(DomainError::InvalidInput(format!(
                "goal target must be greater than 0, got {}",
                target
            )));
        }
        Ok(())
    }
}
