//! Gallery entry repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist authoritative entries and their ordered tag lists.
//! - Apply vote increments in storage without reading counts back first.
//!
//! # Invariants
//! - Stored vote counts never drop below zero (`MAX(0, votes + delta)`).
//! - An entry and its tags are written in one transaction.
//! - Listing order is `timestamp DESC, id ASC`.

use crate::model::entry::{Category, Entry, EntryId};
use crate::repo::{RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row};

const ENTRY_SELECT_SQL: &str = "SELECT
    id,
    name,
    author,
    author_id,
    image_url,
    votes,
    timestamp,
    category,
    ai_critique
FROM gallery_entries";

/// Repository interface for gallery entries.
pub trait GalleryRepository {
    fn list_entries(&self) -> RepoResult<Vec<Entry>>;
    fn get_entry(&self, id: &str) -> RepoResult<Option<Entry>>;
    fn insert_entry(&self, entry: &Entry) -> RepoResult<()>;
    /// Applies `delta` and returns the stored count afterwards.
    fn increment_votes(&self, id: &str, delta: i64) -> RepoResult<u64>;
}

/// SQLite-backed gallery repository.
pub struct SqliteGalleryRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteGalleryRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl GalleryRepository for SqliteGalleryRepository<'_> {
    fn list_entries(&self) -> RepoResult<Vec<Entry>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ENTRY_SELECT_SQL} ORDER BY timestamp DESC, id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            let mut entry = parse_entry_row(row)?;
            entry.tags = load_tags(self.conn, &entry.id)?;
            entries.push(entry);
        }
        Ok(entries)
    }

    fn get_entry(&self, id: &str) -> RepoResult<Option<Entry>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ENTRY_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        match rows.next()? {
            Some(row) => {
                let mut entry = parse_entry_row(row)?;
                entry.tags = load_tags(self.conn, &entry.id)?;
                Ok(Some(entry))
            }
            None => Ok(None),
        }
    }

    fn insert_entry(&self, entry: &Entry) -> RepoResult<()> {
        entry.validate()?;
        let votes = i64::try_from(entry.votes).map_err(|_| {
            RepoError::InvalidData(format!("vote count {} does not fit storage", entry.votes))
        })?;

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO gallery_entries (
                id,
                name,
                author,
                author_id,
                image_url,
                votes,
                timestamp,
                category,
                ai_critique
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
            params![
                entry.id.as_str(),
                entry.name.as_str(),
                entry.author.as_str(),
                entry.author_id.as_str(),
                entry.image_url.as_str(),
                votes,
                entry.timestamp,
                entry.category.as_str(),
                entry.ai_critique.as_deref(),
            ],
        )?;
        for (position, tag) in entry.tags.iter().enumerate() {
            tx.execute(
                "INSERT INTO gallery_entry_tags (entry_id, position, tag)
                 VALUES (?1, ?2, ?3);",
                params![entry.id.as_str(), position as i64, tag.as_str()],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn increment_votes(&self, id: &str, delta: i64) -> RepoResult<u64> {
        let votes = self
            .conn
            .query_row(
                "UPDATE gallery_entries
                 SET votes = MAX(0, votes + ?2)
                 WHERE id = ?1
                 RETURNING votes;",
                params![id, delta],
                |row| row.get::<_, i64>(0),
            )
            .optional()?
            .ok_or_else(|| RepoError::NotFound(id.to_string()))?;
        parse_votes(votes)
    }
}

fn parse_entry_row(row: &Row<'_>) -> RepoResult<Entry> {
    let category_text: String = row.get("category")?;
    let category = category_text.parse::<Category>().map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid category `{category_text}` in gallery_entries.category"
        ))
    })?;

    let entry = Entry {
        id: row.get("id")?,
        name: row.get("name")?,
        author: row.get("author")?,
        author_id: row.get("author_id")?,
        image_url: row.get("image_url")?,
        votes: parse_votes(row.get("votes")?)?,
        timestamp: row.get("timestamp")?,
        category,
        tags: Vec::new(),
        ai_critique: row.get("ai_critique")?,
    };
    entry.validate()?;
    Ok(entry)
}

fn parse_votes(value: i64) -> RepoResult<u64> {
    u64::try_from(value).map_err(|_| {
        RepoError::InvalidData(format!("negative vote count `{value}` in gallery_entries.votes"))
    })
}

fn load_tags(conn: &Connection, entry_id: &EntryId) -> RepoResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT tag
         FROM gallery_entry_tags
         WHERE entry_id = ?1
         ORDER BY position ASC;",
    )?;
    let mut rows = stmt.query([entry_id.as_str()])?;
    let mut tags = Vec::new();
    while let Some(row) = rows.next()? {
        tags.push(row.get(0)?);
    }
    Ok(tags)
}
