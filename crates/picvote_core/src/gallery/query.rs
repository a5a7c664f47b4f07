//! Filtering, searching and sorting for gallery listings.
//!
//! # Invariants
//! - Queries never mutate the entry list; they return borrowed views.
//! - Sorting is stable, so ties keep their incoming order.
//! - Filter results do not depend on any sort applied beforehand.

use crate::model::entry::{CategoryFilter, Entry};
use crate::model::vote::VoteMembership;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Listing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOption {
    /// Most votes first.
    #[default]
    Votes,
    /// Latest timestamp first.
    Newest,
    /// Earliest timestamp first.
    Oldest,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSortOption(pub String);

impl Display for UnknownSortOption {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown sort `{}`; expected votes|newest|oldest", self.0)
    }
}

impl Error for UnknownSortOption {}

impl FromStr for SortOption {
    type Err = UnknownSortOption;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "votes" => Ok(Self::Votes),
            "newest" => Ok(Self::Newest),
            "oldest" => Ok(Self::Oldest),
            other => Err(UnknownSortOption(other.to_string())),
        }
    }
}

/// One gallery listing request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GalleryQuery {
    pub sort: SortOption,
    pub category: CategoryFilter,
    /// Case-insensitive substring over name and tags. Blank matches all.
    pub search: Option<String>,
}

impl GalleryQuery {
    pub fn matches(&self, entry: &Entry) -> bool {
        self.category.matches(entry.category) && matches_search(entry, self.search.as_deref())
    }

    /// Returns matching entries in the requested order.
    pub fn apply<'a>(&self, entries: &'a [Entry]) -> Vec<&'a Entry> {
        let mut selected: Vec<&Entry> = entries
            .iter()
            .filter(|entry| self.matches(entry))
            .collect();
        sort_entries(&mut selected, self.sort);
        selected
    }
}

fn matches_search(entry: &Entry, search: Option<&str>) -> bool {
    let needle = match search.map(str::trim) {
        Some(value) if !value.is_empty() => value.to_lowercase(),
        _ => return true,
    };
    entry.name.to_lowercase().contains(&needle)
        || entry
            .tags
            .iter()
            .any(|tag| tag.to_lowercase().contains(&needle))
}

/// Stable in-place sort of borrowed entries.
pub fn sort_entries(entries: &mut [&Entry], sort: SortOption) {
    match sort {
        SortOption::Votes => entries.sort_by(|a, b| b.votes.cmp(&a.votes)),
        SortOption::Newest => entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp)),
        SortOption::Oldest => entries.sort_by(|a, b| a.timestamp.cmp(&b.timestamp)),
    }
}

/// Profile projection for one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileSummary<'a> {
    /// Entries authored by the user, newest first.
    pub submissions: Vec<&'a Entry>,
    /// Entries the user currently has a vote on, most voted first.
    pub voted: Vec<&'a Entry>,
    /// Sum of votes across the user's submissions.
    pub votes_received: u64,
}

pub fn entries_by_author<'a>(entries: &'a [Entry], author_id: &str) -> Vec<&'a Entry> {
    let mut selected: Vec<&Entry> = entries
        .iter()
        .filter(|entry| entry.author_id == author_id)
        .collect();
    sort_entries(&mut selected, SortOption::Newest);
    selected
}

pub fn voted_entries<'a>(entries: &'a [Entry], membership: &VoteMembership) -> Vec<&'a Entry> {
    let mut selected: Vec<&Entry> = entries
        .iter()
        .filter(|entry| membership.contains(&entry.id))
        .collect();
    sort_entries(&mut selected, SortOption::Votes);
    selected
}

pub fn profile_summary<'a>(
    entries: &'a [Entry],
    membership: &VoteMembership,
    author_id: &str,
) -> ProfileSummary<'a> {
    let submissions = entries_by_author(entries, author_id);
    let votes_received = submissions
        .iter()
        .fold(0u64, |total, entry| total.saturating_add(entry.votes));
    ProfileSummary {
        voted: voted_entries(entries, membership),
        submissions,
        votes_received,
    }
}

#[cfg(test)]
mod tests {
    use super::{profile_summary, GalleryQuery, SortOption};
    use crate::model::entry::{Category, CategoryFilter, Entry};
    use crate::model::vote::VoteMembership;

    fn entry(id: &str, votes: u64, timestamp: i64, category: Category, tags: &[&str]) -> Entry {
        Entry {
            id: id.to_string(),
            name: format!("Entry {id}"),
            author: "Author".to_string(),
            author_id: format!("user{id}"),
            image_url: String::new(),
            votes,
            timestamp,
            category,
            tags: tags.iter().map(|tag| tag.to_string()).collect(),
            ai_critique: None,
        }
    }

    fn seed() -> Vec<Entry> {
        vec![
            entry("1", 1242, 300, Category::Urban, &["Neon", "Cyberpunk"]),
            entry("2", 954, 100, Category::Nature, &["Landscape"]),
            entry("3", 2105, 400, Category::Cozy, &["Warm"]),
            entry("4", 432, 200, Category::Urban, &["Architecture"]),
        ]
    }

    fn votes(listing: &[&Entry]) -> Vec<u64> {
        listing.iter().map(|entry| entry.votes).collect()
    }

    #[test]
    fn sorts_by_votes_descending() {
        let entries = seed();
        let listing = GalleryQuery::default().apply(&entries);
        assert_eq!(votes(&listing), vec![2105, 1242, 954, 432]);
    }

    #[test]
    fn sorts_by_timestamp_both_ways() {
        let entries = seed();
        let newest = GalleryQuery {
            sort: SortOption::Newest,
            ..GalleryQuery::default()
        }
        .apply(&entries);
        assert_eq!(newest[0].id, "3");

        let oldest = GalleryQuery {
            sort: SortOption::Oldest,
            ..GalleryQuery::default()
        }
        .apply(&entries);
        assert_eq!(oldest[0].id, "2");
    }

    #[test]
    fn category_filter_is_independent_of_sort() {
        let entries = seed();
        for sort in [SortOption::Votes, SortOption::Newest, SortOption::Oldest] {
            let listing = GalleryQuery {
                sort,
                category: CategoryFilter::Only(Category::Urban),
                search: None,
            }
            .apply(&entries);
            let mut ids: Vec<&str> = listing.iter().map(|entry| entry.id.as_str()).collect();
            ids.sort_unstable();
            assert_eq!(ids, vec!["1", "4"]);
        }
    }

    #[test]
    fn search_matches_name_or_tag_case_insensitively() {
        let entries = seed();
        let by_tag = GalleryQuery {
            search: Some("neon".to_string()),
            ..GalleryQuery::default()
        }
        .apply(&entries);
        assert_eq!(by_tag.len(), 1);
        assert_eq!(by_tag[0].id, "1");

        let by_name = GalleryQuery {
            search: Some("ENTRY 2".to_string()),
            ..GalleryQuery::default()
        }
        .apply(&entries);
        assert_eq!(by_name[0].id, "2");

        let blank = GalleryQuery {
            search: Some("   ".to_string()),
            ..GalleryQuery::default()
        }
        .apply(&entries);
        assert_eq!(blank.len(), 4);
    }

    #[test]
    fn sort_option_parses_known_names() {
        assert_eq!("Newest".parse::<SortOption>().unwrap(), SortOption::Newest);
        assert!("random".parse::<SortOption>().is_err());
    }

    #[test]
    fn profile_collects_submissions_and_votes() {
        let mut entries = seed();
        entries.push(entry("5", 10, 500, Category::Portrait, &[]));
        entries[4].author_id = "user1".to_string();
        let membership: VoteMembership = ["2", "3"].into_iter().collect();

        let profile = profile_summary(&entries, &membership, "user1");
        let submitted: Vec<&str> = profile.submissions.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(submitted, vec!["5", "1"]);
        assert_eq!(profile.votes_received, 1252);
        let voted: Vec<&str> = profile.voted.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(voted, vec!["3", "2"]);
    }
}
