//! Entry submission flow.
//!
//! # Responsibility
//! - Offer optional AI suggestions for a picked image.
//! - Turn a draft into a new entry owned by the signed-in identity.
//! - Insert the entry remotely, then prepend it to the local state.
//!
//! # Invariants
//! - New entries start at zero votes with a freshly generated id.
//! - Nothing reaches the remote gallery without an identity.

use crate::model::entry::{
    new_entry_id, normalize_tags, Entry, EntryDraft, EntryValidationError, UNTITLED_ENTRY_NAME,
};
use crate::model::identity::Identity;
use crate::model::state::GalleryState;
use crate::remote::{AnalysisSuggestion, ImageAnalyzer, RemoteError, RemoteGallery};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug)]
pub enum SubmissionError {
    AuthenticationRequired,
    Validation(EntryValidationError),
    Remote(RemoteError),
}

impl Display for SubmissionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AuthenticationRequired => write!(f, "sign in to submit an entry"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Remote(err) => write!(f, "failed to publish entry: {err}"),
        }
    }
}

impl Error for SubmissionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::AuthenticationRequired => None,
            Self::Validation(err) => Some(err),
            Self::Remote(err) => Some(err),
        }
    }
}

impl From<EntryValidationError> for SubmissionError {
    fn from(value: EntryValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RemoteError> for SubmissionError {
    fn from(value: RemoteError) -> Self {
        Self::Remote(value)
    }
}

pub struct SubmissionService {
    remote: Arc<dyn RemoteGallery>,
    analyzer: Arc<dyn ImageAnalyzer>,
}

impl SubmissionService {
    pub fn new(remote: Arc<dyn RemoteGallery>, analyzer: Arc<dyn ImageAnalyzer>) -> Self {
        Self { remote, analyzer }
    }

    /// Asks the analysis service for title/tags/category/critique.
    ///
    /// `None` means the form falls back to manual input.
    pub async fn suggest(&self, image: &[u8], mime_type: &str) -> Option<AnalysisSuggestion> {
        let suggestion = self.analyzer.analyze(image, mime_type).await;
        if suggestion.is_none() {
            warn!(
                "event=submission_suggest module=submission status=unavailable mime_type={}",
                mime_type
            );
        }
        suggestion
    }

    /// Publishes the draft and returns the next state plus the new entry.
    pub async fn submit(
        &self,
        state: &GalleryState,
        draft: EntryDraft,
    ) -> Result<(GalleryState, Entry), SubmissionError> {
        let identity = state
            .identity
            .as_ref()
            .ok_or(SubmissionError::AuthenticationRequired)?;
        let entry = build_entry(identity, draft, now_epoch_ms());
        entry.validate()?;

        self.remote.insert_entry(&entry).await?;
        info!(
            "event=submission module=submission status=ok entry_id={} category={} tag_count={}",
            entry.id,
            entry.category,
            entry.tags.len()
        );
        Ok((state.with_entry_prepended(entry.clone()), entry))
    }
}

/// Builds a fresh entry from a draft.
///
/// Blank name becomes `Untitled`; missing category becomes the default.
pub fn build_entry(identity: &Identity, draft: EntryDraft, timestamp: i64) -> Entry {
    let name = draft.name.trim();
    Entry {
        id: new_entry_id(),
        name: if name.is_empty() {
            UNTITLED_ENTRY_NAME.to_string()
        } else {
            name.to_string()
        },
        author: identity.name.clone(),
        author_id: identity.id.clone(),
        image_url: draft.image_url,
        votes: 0,
        timestamp,
        category: draft.category.unwrap_or_default(),
        tags: normalize_tags(&draft.tags),
        ai_critique: draft
            .critique
            .map(|critique| critique.trim().to_string())
            .filter(|critique| !critique.is_empty()),
    }
}

/// Encodes image bytes as a `data:` URI usable as an entry image reference.
pub fn image_data_url(image: &[u8], mime_type: &str) -> String {
    format!("data:{mime_type};base64,{}", BASE64.encode(image))
}

fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::{build_entry, image_data_url};
    use crate::model::entry::{Category, EntryDraft};
    use crate::model::identity::Identity;

    fn identity() -> Identity {
        Identity {
            id: "u-abc".to_string(),
            name: "Creative Soul".to_string(),
            handle: "creative_mind".to_string(),
            avatar: String::new(),
        }
    }

    #[test]
    fn build_entry_applies_defaults_and_author() {
        let entry = build_entry(
            &identity(),
            EntryDraft {
                name: "   ".to_string(),
                image_url: "https://example.com/a.jpg".to_string(),
                tags: vec!["Warm".to_string(), " Warm ".to_string()],
                category: None,
                critique: Some("  ".to_string()),
            },
            42,
        );

        assert_eq!(entry.name, "Untitled");
        assert_eq!(entry.author, "Creative Soul");
        assert_eq!(entry.author_id, "u-abc");
        assert_eq!(entry.votes, 0);
        assert_eq!(entry.timestamp, 42);
        assert_eq!(entry.category, Category::Nature);
        assert_eq!(entry.tags, vec!["Warm"]);
        assert_eq!(entry.ai_critique, None);
    }

    #[test]
    fn data_url_carries_mime_and_base64_payload() {
        assert_eq!(image_data_url(b"abc", "image/png"), "data:image/png;base64,YWJj");
    }
}
