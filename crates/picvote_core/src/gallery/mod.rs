//! Read-side gallery projections (listing and profile views).

pub mod query;

pub use query::{
    entries_by_author, profile_summary, voted_entries, GalleryQuery, ProfileSummary, SortOption,
};
