//! Contracts for the external collaborators the gallery talks to.
//!
//! # Responsibility
//! - Define async traits for the remote gallery, the identity provider and
//!   the image analysis service.
//! - Ship local implementations so the app runs without any cloud backend.
//!
//! # Invariants
//! - Implementations are `Send + Sync` so they can be shared with background
//!   sync tasks.
//! - Analysis failures never surface as errors; they yield `None`.

use crate::model::entry::{Category, Entry, EntryDraft};
use crate::model::identity::{Credentials, Identity};
use crate::repo::RepoError;
use async_trait::async_trait;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod gemini;
pub mod local_gallery;
pub mod local_identity;

pub use gemini::{DisabledAnalyzer, GeminiAnalyzer};
pub use local_gallery::{LocalGalleryService, SimulatedLatency};
pub use local_identity::LocalIdentityProvider;

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Failure of a remote gallery call.
#[derive(Debug)]
pub enum RemoteError {
    /// Backing storage rejected the operation.
    Repo(RepoError),
    /// Service could not be reached or its worker died.
    Unavailable(String),
}

impl Display for RemoteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Repo(err) => write!(f, "{err}"),
            Self::Unavailable(message) => write!(f, "gallery service unavailable: {message}"),
        }
    }
}

impl Error for RemoteError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::Unavailable(_) => None,
        }
    }
}

impl From<RepoError> for RemoteError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Authoritative store of contest entries and vote counts.
#[async_trait]
pub trait RemoteGallery: Send + Sync {
    async fn list_entries(&self) -> RemoteResult<Vec<Entry>>;
    async fn insert_entry(&self, entry: &Entry) -> RemoteResult<()>;
    /// Adds a signed delta to one entry's count, flooring at zero.
    ///
    /// Not idempotent: the sync queue retries a call that returned `Err`, so
    /// an implementation must either apply the delta and return `Ok`, or
    /// fail without applying it.
    async fn increment_votes(&self, entry_id: &str, delta: i64) -> RemoteResult<()>;
    /// Returns the resumable session identity, if any.
    async fn get_session(&self) -> RemoteResult<Option<Identity>>;
}

/// Authentication failure, displayable to the user as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    InvalidCredentials(String),
    Unavailable(String),
}

impl Display for AuthError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidCredentials(message) => write!(f, "{message}"),
            Self::Unavailable(message) => {
                write!(f, "sign-in is unavailable right now: {message}")
            }
        }
    }
}

impl Error for AuthError {}

/// Identity backend that turns credentials into a stable identity.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn authenticate(&self, credentials: &Credentials) -> Result<Identity, AuthError>;
}

/// Suggested form fields produced by image analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisSuggestion {
    pub title: String,
    pub tags: Vec<String>,
    pub critique: String,
    pub category: Category,
}

impl AnalysisSuggestion {
    /// Fills the draft with the suggestion, replacing title, tags, category
    /// and critique; the image reference is kept.
    pub fn apply_to(&self, draft: &mut EntryDraft) {
        if !self.title.trim().is_empty() {
            draft.name = self.title.trim().to_string();
        }
        draft.tags.clear();
        for tag in &self.tags {
            draft.add_tag(tag);
        }
        draft.category = Some(self.category);
        if !self.critique.trim().is_empty() {
            draft.critique = Some(self.critique.trim().to_string());
        }
    }
}

/// Image analysis service consumed by the submission flow.
#[async_trait]
pub trait ImageAnalyzer: Send + Sync {
    /// Returns `None` when no suggestion is available for any reason.
    async fn analyze(&self, image: &[u8], mime_type: &str) -> Option<AnalysisSuggestion>;
}

#[cfg(test)]
mod tests {
    use super::AnalysisSuggestion;
    use crate::model::entry::{Category, EntryDraft};

    #[test]
    fn suggestion_replaces_form_fields_and_dedupes_tags() {
        let mut draft = EntryDraft {
            name: String::new(),
            image_url: "data:image/png;base64,AAAA".to_string(),
            tags: vec!["old".to_string()],
            category: None,
            critique: None,
        };
        let suggestion = AnalysisSuggestion {
            title: " Quiet Peak ".to_string(),
            tags: vec!["Nature".to_string(), "Nature".to_string(), "Snow".to_string()],
            critique: "Balanced horizon.".to_string(),
            category: Category::Nature,
        };

        suggestion.apply_to(&mut draft);
        assert_eq!(draft.name, "Quiet Peak");
        assert_eq!(draft.tags, vec!["Nature", "Snow"]);
        assert_eq!(draft.category, Some(Category::Nature));
        assert_eq!(draft.critique.as_deref(), Some("Balanced horizon."));
        assert_eq!(draft.image_url, "data:image/png;base64,AAAA");
    }
}
