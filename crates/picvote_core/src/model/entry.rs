//! Contest entry domain model.
//!
//! # Responsibility
//! - Define the canonical entry record shared by the gallery, the
//!   reconciler and the submission flow.
//! - Normalize user/AI supplied draft fields before an entry exists.
//!
//! # Invariants
//! - `id` is unique and never reused for another entry.
//! - `votes` is never negative; it changes only through vote deltas.
//! - `tags` are trimmed, non-empty and free of duplicates.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

/// Opaque entry identifier.
///
/// Seed entries use short numeric ids; submitted entries use UUID text.
pub type EntryId = String;

/// Fallback title for drafts submitted without a name.
pub const UNTITLED_ENTRY_NAME: &str = "Untitled";

/// Fixed set of contest categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Category {
    #[default]
    Nature,
    Urban,
    Minimalist,
    Portrait,
    Cozy,
}

impl Category {
    /// All categories in display order.
    pub const ALL: [Category; 5] = [
        Category::Nature,
        Category::Urban,
        Category::Minimalist,
        Category::Portrait,
        Category::Cozy,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Nature => "Nature",
            Self::Urban => "Urban",
            Self::Minimalist => "Minimalist",
            Self::Portrait => "Portrait",
            Self::Cozy => "Cozy",
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for category names outside the fixed set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCategory(pub String);

impl Display for UnknownCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "unknown category `{}`; expected Nature|Urban|Minimalist|Portrait|Cozy",
            self.0
        )
    }
}

impl Error for UnknownCategory {}

impl FromStr for Category {
    type Err = UnknownCategory;

    /// Case-insensitive; surrounding whitespace is ignored.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        Self::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownCategory(trimmed.to_string()))
    }
}

/// Category selector used by gallery queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(Category),
}

impl CategoryFilter {
    pub fn matches(self, category: Category) -> bool {
        match self {
            Self::All => true,
            Self::Only(expected) => expected == category,
        }
    }
}

impl FromStr for CategoryFilter {
    type Err = UnknownCategory;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value.trim().eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        value.parse().map(Self::Only)
    }
}

/// Validation failures for entry records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryValidationError {
    EmptyId,
    EmptyName,
    EmptyAuthorId,
    InvalidTag(String),
}

impl Display for EntryValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyId => write!(f, "entry id cannot be empty"),
            Self::EmptyName => write!(f, "entry name cannot be empty"),
            Self::EmptyAuthorId => write!(f, "entry author id cannot be empty"),
            Self::InvalidTag(tag) => write!(f, "invalid entry tag `{tag}`"),
        }
    }
}

impl Error for EntryValidationError {}

/// One contest submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: EntryId,
    /// Display title.
    pub name: String,
    /// Author display name at submission time.
    pub author: String,
    pub author_id: String,
    /// URL or `data:` URI of the submitted image.
    pub image_url: String,
    pub votes: u64,
    /// Unix epoch milliseconds. Used for ordering only.
    pub timestamp: i64,
    pub category: Category,
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_critique: Option<String>,
}

impl Entry {
    /// Checks record-level invariants before persistence.
    pub fn validate(&self) -> Result<(), EntryValidationError> {
        if self.id.trim().is_empty() {
            return Err(EntryValidationError::EmptyId);
        }
        if self.name.trim().is_empty() {
            return Err(EntryValidationError::EmptyName);
        }
        if self.author_id.trim().is_empty() {
            return Err(EntryValidationError::EmptyAuthorId);
        }
        if let Some(tag) = self.tags.iter().find(|tag| tag.trim().is_empty()) {
            return Err(EntryValidationError::InvalidTag(tag.clone()));
        }
        Ok(())
    }

    /// Applies a signed delta, flooring the result at zero.
    pub fn apply_vote_delta(&mut self, delta: i64) {
        self.votes = floored_add(self.votes, delta);
    }
}

/// Adds a signed delta to a vote count without going below zero.
pub fn floored_add(votes: u64, delta: i64) -> u64 {
    if delta >= 0 {
        votes.saturating_add(delta.unsigned_abs())
    } else {
        votes.saturating_sub(delta.unsigned_abs())
    }
}

/// Generates a fresh entry identifier.
pub fn new_entry_id() -> EntryId {
    Uuid::new_v4().simple().to_string()
}

/// Candidate entry collected by the submission form.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EntryDraft {
    pub name: String,
    pub image_url: String,
    pub tags: Vec<String>,
    pub category: Option<Category>,
    pub critique: Option<String>,
}

impl EntryDraft {
    /// Adds one tag unless it is blank or already present.
    ///
    /// Returns whether the tag was added.
    pub fn add_tag(&mut self, tag: &str) -> bool {
        let trimmed = tag.trim();
        if trimmed.is_empty() || self.tags.iter().any(|existing| existing == trimmed) {
            return false;
        }
        self.tags.push(trimmed.to_string());
        true
    }

    pub fn remove_tag(&mut self, tag: &str) {
        self.tags.retain(|existing| existing != tag);
    }
}

/// Trims and deduplicates tags, keeping first occurrence order.
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut draft = EntryDraft::default();
    for tag in tags {
        draft.add_tag(tag);
    }
    draft.tags
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(votes: u64) -> Entry {
        Entry {
            id: "1".to_string(),
            name: "Neon Solitude".to_string(),
            author: "Elena Vance".to_string(),
            author_id: "user1".to_string(),
            image_url: "https://example.com/neon.jpg".to_string(),
            votes,
            timestamp: 0,
            category: Category::Urban,
            tags: vec!["Urban".to_string()],
            ai_critique: None,
        }
    }

    #[test]
    fn category_parses_case_insensitively() {
        assert_eq!("urban".parse::<Category>().unwrap(), Category::Urban);
        assert_eq!(" COZY ".parse::<Category>().unwrap(), Category::Cozy);
        assert!("Abstract".parse::<Category>().is_err());
    }

    #[test]
    fn category_filter_all_matches_everything() {
        let filter: CategoryFilter = "All".parse().unwrap();
        assert!(Category::ALL.iter().all(|category| filter.matches(*category)));

        let urban: CategoryFilter = "Urban".parse().unwrap();
        assert!(urban.matches(Category::Urban));
        assert!(!urban.matches(Category::Nature));
    }

    #[test]
    fn vote_delta_is_floored_at_zero() {
        let mut target = entry(0);
        target.apply_vote_delta(-1);
        assert_eq!(target.votes, 0);
        target.apply_vote_delta(1);
        assert_eq!(target.votes, 1);
    }

    #[test]
    fn normalize_tags_trims_and_keeps_first_occurrence() {
        let tags = vec![
            " Neon ".to_string(),
            "Urban".to_string(),
            "Neon".to_string(),
            "  ".to_string(),
        ];
        assert_eq!(normalize_tags(&tags), vec!["Neon", "Urban"]);
    }

    #[test]
    fn validate_rejects_blank_fields() {
        let mut invalid = entry(1);
        invalid.name = "  ".to_string();
        assert_eq!(invalid.validate(), Err(EntryValidationError::EmptyName));

        let mut invalid = entry(1);
        invalid.tags.push(String::new());
        assert!(matches!(
            invalid.validate(),
            Err(EntryValidationError::InvalidTag(_))
        ));
    }

    #[test]
    fn generated_ids_are_unique() {
        assert_ne!(new_entry_id(), new_entry_id());
    }
}
