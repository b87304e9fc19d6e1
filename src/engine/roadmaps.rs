/// Roadmap transitions
///
/// Every function takes the current state by reference and returns a new
/// state; progress, `dateUpdated` and the completion estimate are recomputed
/// on each mutation.

use chrono::{DateTime, Utc};

use crate::domain::{
    ItemDraft, ItemId, Roadmap, RoadmapDraft, RoadmapId, RoadmapItem, UserGoals,
};
use crate::engine::{EngineError, EntityKind};

/// Append a new roadmap built from `draft`
pub fn add_roadmap(
    state: &UserGoals,
    id: &RoadmapId,
    draft: RoadmapDraft,
    now: DateTime<Utc>,
) -> Result<UserGoals, EngineError> {
    if state.roadmap(id).is_some() {
        return Err(EngineError::InvalidInput(format!("roadmap {} already exists", id)));
    }

    let roadmap = Roadmap::new(id.clone(), draft, now)?;
    let mut next = state.clone();
    tracing::debug!("Adding roadmap '{}' with {} items", roadmap.title, roadmap.items().len());
    next.roadmaps.push(roadmap);
    Ok(next)
}

/// Remove a roadmap; an unknown id leaves the state untouched
pub fn delete_roadmap(state: &UserGoals, id: &RoadmapId) -> UserGoals {
    let mut next = state.clone();
    next.roadmaps.retain(|r| &r.id != id);
    next
}

/// Append an item to an existing roadmap
pub fn add_item(
    state: &UserGoals,
    roadmap_id: &RoadmapId,
    item_id: &ItemId,
    draft: ItemDraft,
    now: DateTime<Utc>,
) -> Result<UserGoals, EngineError> {
    let mut next = state.clone();
    let roadmap = find_roadmap(&mut next, roadmap_id)?;
    if roadmap.item(item_id).is_some() {
        return Err(EngineError::InvalidInput(format!("item {} already exists", item_id)));
    }

    roadmap.push_item(RoadmapItem::new(item_id.clone(), draft, now)?);
    roadmap.refresh(now);
    Ok(next)
}

/// Mark an item completed and recompute the roadmap's derived fields
pub fn complete_item(
    state: &UserGoals,
    roadmap_id: &RoadmapId,
    item_id: &ItemId,
    now: DateTime<Utc>,
) -> Result<UserGoals, EngineError> {
    let mut next = state.clone();
    let roadmap = find_roadmap(&mut next, roadmap_id)?;
    roadmap
        .item_mut(item_id)
        .ok_or_else(|| EngineError::not_found(EntityKind::Item, item_id.as_str()))?
        .mark_completed(now);
    roadmap.refresh(now);

    tracing::debug!(
        "Completed item {} of roadmap {} ({}%)",
        item_id,
        roadmap_id,
        roadmap.progress()
    );
    Ok(next)
}

/// Clear an item's completion, the only way `dateCompleted` is removed
pub fn uncomplete_item(
    state: &UserGoals,
    roadmap_id: &RoadmapId,
    item_id: &ItemId,
    now: DateTime<Utc>,
) -> Result<UserGoals, EngineError> {
    let mut next = state.clone();
    let roadmap = find_roadmap(&mut next, roadmap_id)?;
    roadmap
        .item_mut(item_id)
        .ok_or_else(|| EngineError::not_found(EntityKind::Item, item_id.as_str()))?
        .mark_incomplete();
    roadmap.refresh(now);
    Ok(next)
}

fn find_roadmap<'a>(
    state: &'a mut UserGoals,
    roadmap_id: &RoadmapId,
) -> Result<&'a mut Roadmap, EngineError> {
    state
        .roadmap_mut(roadmap_id)
        .ok_or_else(|| EngineError::not_found(EntityKind::Roadmap, roadmap_id.as_str()))
}
