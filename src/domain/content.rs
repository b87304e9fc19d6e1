/// Learning content descriptors
///
/// Words, exercises and videos are immutable reference data, not user state.
/// They are only ever replaced as a whole through a bulk import.

use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// A German/English term pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Word {
    pub german: String,
    pub english: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// A prompt with one or more accepted answers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    pub id: String,
    pub prompt: String,
    pub answers: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl Exercise {
    /// Check a user answer against the accepted answers
    ///
    /// Comparison ignores surrounding whitespace, repeated inner spaces and case.
    pub fn is_correct(&self, answer: &str) -> bool {
        let given = normalize_answer(answer);
        !given.is_empty() && self.answers.iter().any(|a| normalize_answer(a) == given)
    }
}

fn normalize_answer(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Video metadata with optional transcript and embedded practice material
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoContent {
    pub id: String,
    pub title: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
    #[serde(default)]
    pub vocabulary: Vec<Word>,
    #[serde(default)]
    pub exercises: Vec<Exercise>,
}

/// The full set of content known to the client
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentLibrary {
    #[serde(default)]
    pub words: Vec<Word>,
    #[serde(default)]
    pub exercises: Vec<Exercise>,
    #[serde(default)]
    pub videos: Vec<VideoContent>,
}

impl ContentLibrary {
    /// Storage key the library is persisted under
    pub const STORAGE_KEY: &'static str = "content:library";

    /// Parse and validate a bulk import document
    pub fn import_json(json: &str) -> Result<Self, DomainError> {
        let library: ContentLibrary = serde_json::from_str(json)
            .map_err(|e| DomainError::InvalidInput(format!("invalid content document: {}", e)))?;
        library.validate()?;
        Ok(library)
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        let embedded = self.videos.iter().flat_map(|v| v.exercises.iter());
        for exercise in self.exercises.iter().chain(embedded) {
            if exercise.prompt.trim().is_empty() {
                return Err(DomainError::InvalidInput(format!(
                    "exercise {} has an empty prompt",
                    exercise.id
                )));
            }
            if exercise.answers.iter().all(|a| a.trim().is_empty()) {
                return Err(DomainError::InvalidInput(format!(
                    "exercise {} has no accepted answer",
                    exercise.id
                )));
            }
        }

        let embedded_words = self.videos.iter().flat_map(|v| v.vocabulary.iter());
        for word in self.words.iter().chain(embedded_words) {
            if word.german.trim().is_empty() || word.english.trim().is_empty() {
                return Err(DomainError::InvalidInput(
                    "word entries need both a German and an English term".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Look up a word by either of its terms (case-insensitive)
    pub fn find_word(&self, term: &str) -> Option<&Word> {
        let term = term.trim().to_lowercase();
        self.words
            .iter()
            .find(|w| w.german.to_lowercase() == term || w.english.to_lowercase() == term)
    }

    pub fn video(&self, id: &str) -> Option<&VideoContent> {
        self.videos.iter().find(|v| v.id == id)
    }
}
