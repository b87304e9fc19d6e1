/// Core types and enums used throughout the domain layer
///
/// This module defines the identifier newtypes and the small enums (categories,
/// item kinds, priorities) shared by goals, roadmaps and their items.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Namespace used to derive roadmap item ids from their roadmap id and position
const ITEM_ID_NAMESPACE: Uuid = Uuid::from_u128(0x6c1f_9a3e_52d4_4f0b_9d8e_2a7b_41c3_e5f6);

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Generate a new random identifier
            pub fn new() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            /// Borrow the raw string form
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

string_id! {
    /// Unique identifier for a goal
    ///
    /// Stored as a plain string so documents written by other clients (which may
    /// not use UUIDs) still load.
    GoalId
}

string_id! {
    /// Unique identifier for a roadmap
    RoadmapId
}

string_id! {
    /// Unique identifier for an item inside a roadmap
    ItemId
}

string_id! {
    /// Opaque account identifier handed over by the identity provider
    UserId
}

impl UserId {
    /// Identity used when nobody is signed in
    pub fn anonymous() -> Self {
        Self("anonymous".to_string())
    }
}

impl ItemId {
    /// Deterministic id for the item at `index` of a roadmap
    ///
    /// Engine transitions must be replayable, so item ids cannot be random.
    pub fn derived(roadmap_id: &RoadmapId, index: usize) -> Self {
        let name = format!("{}/{}", roadmap_id.as_str(), index);
        Self(Uuid::new_v5(&ITEM_ID_NAMESPACE, name.as_bytes()).to_string())
    }
}

/// Learning area a goal or roadmap belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Vocabulary,
    Grammar,
    Speaking,
    Listening,
    Reading,
    Writing,
    General,
}

impl Category {
    /// All categories in display order
    pub const ALL: [Category; 7] = [
        Category::Vocabulary,
        Category::Grammar,
        Category::Speaking,
        Category::Listening,
        Category::Reading,
        Category::Writing,
        Category::General,
    ];

    /// Get the display name for this category
    pub fn display_name(&self) -> &'static str {
        match self {
            Category::Vocabulary => "Vocabulary",
            Category::Grammar => "Grammar",
            Category::Speaking => "Speaking",
            Category::Listening => "Listening",
            Category::Reading => "Reading",
            Category::Writing => "Writing",
            Category::General => "General",
        }
    }

    /// Parse a category from user input (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.display_name().to_lowercase() == wanted)
    }
}

/// Kind of learning activity a roadmap item represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Video,
    Exercise,
    Quiz,
    Flashcard,
    Custom,
}

impl ItemType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "video" => Some(ItemType::Video),
            "exercise" => Some(ItemType::Exercise),
            "quiz" => Some(ItemType::Quiz),
            "flashcard" => Some(ItemType::Flashcard),
            "custom" => Some(ItemType::Custom),
            _ => None,
        }
    }
}

/// Priority of a roadmap item
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "low" => Some(Priority::Low),
            "medium" => Some(Priority::Medium),
            "high" => Some(Priority::High),
            _ => None,
        }
    }
}
