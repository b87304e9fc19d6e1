/// Roadmap and RoadmapItem entities
///
/// A roadmap is an ordered plan of learning activities. Its `progress` and the
/// items' `date_completed` are derived data: they only change through the
/// methods here, which keep them consistent with the `completed` flags.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::{lenient_percent, Category, DomainError, ItemId, ItemType, Priority, RoadmapId};

/// One learning activity inside a roadmap
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoadmapItem {
    pub id: ItemId,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    pub title: String,
    #[serde(default)]
    completed: bool,
    #[serde(default)]
    pub priority: Priority,
    /// Estimated effort in minutes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_time: Option<u32>,
    pub date_added: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    date_completed: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// User-supplied fields for a new roadmap item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDraft {
    #[serde(rename = "type")]
    pub item_type: ItemType,
    pub title: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub estimated_time: Option<u32>,
}

impl RoadmapItem {
    pub fn new(id: ItemId, draft: ItemDraft, now: DateTime<Utc>) -> Result<Self, DomainError> {
        let title = draft.title.trim();
        if title.is_empty() {
            return Err(DomainError::InvalidInput("item title cannot be empty".to_string()));
        }

        Ok(Self {
            id,
            item_type: draft.item_type,
            title: title.to_string(),
            completed: false,
            priority: draft.priority,
            estimated_time: draft.estimated_time,
            date_added: now,
            date_completed: None,
            extra: Map::new(),
        })
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn date_completed(&self) -> Option<DateTime<Utc>> {
        self.date_completed
    }

    /// Mark completed; an already-completed item keeps its original date
    pub(crate) fn mark_completed(&mut self, now: DateTime<Utc>) {
        if !self.completed {
            self.completed = true;
            self.date_completed = Some(now);
        }
    }

    pub(crate) fn mark_incomplete(&mut self) {
        self.completed = false;
        self.date_completed = None;
    }

    pub(crate) fn normalize(&mut self) {
        match (self.completed, self.date_completed) {
            // Completed without a date: fall back to the date it was added
            (true, None) => self.date_completed = Some(self.date_added),
            (false, Some(_)) => self.date_completed = None,
            _ => {}
        }
    }
}

/// An ordered, user-defined plan of learning activities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Roadmap {
    pub id: RoadmapId,
    pub title: String,
    /// Free-text description of what the roadmap works toward
    #[serde(default)]
    pub goal: String,
    pub category: Category,
    /// Planned study time per week, in minutes
    #[serde(default)]
    pub weekly_time: u32,
    #[serde(default)]
    items: Vec<RoadmapItem>,
    #[serde(default, deserialize_with = "lenient_percent")]
    progress: u8,
    pub date_created: DateTime<Utc>,
    #[serde(default)]
    date_updated: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    estimated_completion_date: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// User-supplied fields for a new roadmap
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoadmapDraft {
    pub title: String,
    #[serde(default)]
    pub goal: String,
    pub category: Category,
    #[serde(default)]
    pub weekly_time: u32,
    #[serde(default)]
    pub items: Vec<ItemDraft>,
}

impl Roadmap {
    /// Build a roadmap from a draft; item ids are derived from the roadmap id
    pub fn new(id: RoadmapId, draft: RoadmapDraft, now: DateTime<Utc>) -> Result<Self, DomainError> {
        let title = draft.title.trim();
        if title.is_empty() {
            return Err(DomainError::InvalidInput("roadmap title cannot be empty".to_string()));
        }

        let items = draft
            .items
            .into_iter()
            .enumerate()
            .map(|(index, item)| RoadmapItem::new(ItemId::derived(&id, index), item, now))
            .collect::<Result<Vec<_>, _>>()?;

        let mut roadmap = Self {
            id,
            title: title.to_string(),
            goal: draft.goal.trim().to_string(),
            category: draft.category,
            weekly_time: draft.weekly_time,
            items,
            progress: 0,
            date_created: now,
            date_updated: now,
            estimated_completion_date: None,
            extra: Map::new(),
        };
        roadmap.progress = roadmap.computed_progress();
        Ok(roadmap)
    }

    pub fn items(&self) -> &[RoadmapItem] {
        &self.items
    }

    pub fn item(&self, item_id: &ItemId) -> Option<&RoadmapItem> {
        self.items.iter().find(|i| &i.id == item_id)
    }

    pub(crate) fn item_mut(&mut self, item_id: &ItemId) -> Option<&mut RoadmapItem> {
        self.items.iter_mut().find(|i| &i.id == item_id)
    }

    pub(crate) fn push_item(&mut self, item: RoadmapItem) {
        self.items.push(item);
    }

    /// Completion percentage, always equal to `computed_progress()`
    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn date_updated(&self) -> DateTime<Utc> {
        self.date_updated
    }

    pub fn estimated_completion_date(&self) -> Option<DateTime<Utc>> {
        self.estimated_completion_date
    }

    pub fn completed_count(&self) -> usize {
        self.items.iter().filter(|i| i.is_completed()).count()
    }

    /// round(100 * completed / total), 0 for an empty roadmap
    pub fn computed_progress(&self) -> u8 {
        let total = self.items.len();
        if total == 0 {
            return 0;
        }
        ((self.completed_count() as f64 * 100.0) / total as f64).round() as u8
    }

    /// Recompute every derived field after a mutation at `now`
    pub(crate) fn refresh(&mut self, now: DateTime<Utc>) {
        self.progress = self.computed_progress();
        // dateUpdated never moves backward
        if now > self.date_updated {
            self.date_updated = now;
        }
        self.estimated_completion_date = self.project_completion(now);
    }

    /// Linear projection of the completion date from the pace so far
    ///
    /// Returns `None` when the pace is unknown (nothing completed yet or no
    /// time elapsed since creation). A fully completed roadmap projects to its
    /// last completion.
    pub fn project_completion(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let total = self.items.len();
        if total == 0 {
            return None;
        }
        let completed = self.completed_count();
        let remaining = total - completed;
        if remaining == 0 {
            return Some(self.latest_completion().unwrap_or(now).max(self.date_created));
        }
        if completed == 0 {
            return None;
        }

        let elapsed_days = (now - self.date_created).num_seconds() as f64 / 86_400.0;
        if elapsed_days <= 0.0 {
            return None;
        }

        let per_day = completed as f64 / elapsed_days;
        let days_left = remaining as f64 / per_day;
        let seconds_left = (days_left * 86_400.0).round();
        if !seconds_left.is_finite() || seconds_left > i64::MAX as f64 / 2.0 {
            return None;
        }
        now.checked_add_signed(Duration::seconds(seconds_left as i64))
    }

    fn latest_completion(&self) -> Option<DateTime<Utc>> {
        self.items.iter().filter_map(|i| i.date_completed()).max()
    }

    pub(crate) fn normalize(&mut self) {
        for item in &mut self.items {
            item.normalize();
        }
        self.progress = self.computed_progress();
        if self.date_updated < self.date_created {
            self.date_updated = self.date_created;
        }
    }

    pub(crate) fn check_invariants(&self) -> Result<(), String> {
        if self.progress != self.computed_progress() {
            return Err(format!(
                "roadmap {} progress {} does not match its items ({})",
                self.id,
                self.progress,
                self.computed_progress()
            ));
        }
        for item in &self.items {
            if item.is_completed() != item.date_completed().is_some() {
                return Err(format!("item {} completion date is inconsistent", item.id));
            }
        }
        Ok(())
    }
}
