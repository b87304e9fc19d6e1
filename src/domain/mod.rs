/// Domain module containing the core entities and their validation rules
///
/// This module defines the learning content descriptors, roadmaps, goals and
/// the persisted `UserGoals` root. Derived fields (roadmap progress, goal
/// completion) can only be changed through the methods defined here.

pub mod content;
pub mod goal;
pub mod roadmap;
pub mod types;
pub mod user_goals;

// Re-export public types for easy access
pub use content::*;
pub use goal::*;
pub use roadmap::*;
pub use types::*;
pub use user_goals::*;

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use thiserror::Error;

/// Errors that can occur while building or validating domain entities
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

// Derived counters written by other clients may be fractional, negative or
// missing; they are read leniently and repaired by normalization.

fn stored_number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_f64().filter(|n| n.is_finite()).unwrap_or(0.0))
}

/// Read a stored percentage as the nearest value in `0..=100`
pub(crate) fn lenient_percent<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(stored_number(deserializer)?.round().clamp(0.0, 100.0) as u8)
}

/// Read a stored count as the nearest non-negative `u32`
pub(crate) fn lenient_count<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(stored_number(deserializer)?.round().clamp(0.0, f64::from(u32::MAX)) as u32)
}
