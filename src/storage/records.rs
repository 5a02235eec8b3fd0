//! Profile record store
//!
//! Records are addressed by a two-level key: a coarse partition key (first
//! letter of the display name, uppercased) and a row key unique within the
//! partition. Partitions are read in pages ordered by row key so a caller
//! can stop early or resume from a cursor.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::SqlitePool;

use super::StoreError;

/// A stored profile, read-only from the service's point of view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileRecord {
    pub partition_key: String,
    pub row_key: String,
    pub name: String,
    pub description: String,
    pub linkedin: String,
    pub github: String,
    /// Serialized structured value, never parsed here
    pub skills: String,
    pub timestamp: Option<DateTime<Utc>>,
}

/// One page of a partition scan
#[derive(Debug, Clone, Default)]
pub struct RecordPage {
    pub records: Vec<ProfileRecord>,
    /// Row key to resume after, or None when the partition is exhausted
    pub next: Option<String>,
}

/// Read capability over the profile record store
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch up to `limit` records of a partition whose row key sorts after
    /// `after`. Filters are always bound parameters.
    async fn scan_partition(
        &self,
        partition_key: &str,
        after: Option<&str>,
        limit: usize,
    ) -> Result<RecordPage, StoreError>;
}

/// SQLite-backed record store
#[derive(Clone)]
pub struct SqliteRecordStore {
    pool: SqlitePool,
}

impl SqliteRecordStore {
    /// Create a record store over the given connection pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn scan_partition(
        &self,
        partition_key: &str,
        after: Option<&str>,
        limit: usize,
    ) -> Result<RecordPage, StoreError> {
        if limit == 0 {
            return Ok(RecordPage::default());
        }

        let rows: Vec<ProfileRow> = sqlx::query_as(
            r#"
            SELECT partition_key, row_key, name, description, linkedin, github, skills, updated_at
            FROM profiles
            WHERE partition_key = ? AND (? IS NULL OR row_key > ?)
            ORDER BY row_key
            LIMIT ?
            "#,
        )
        .bind(partition_key)
        .bind(after)
        .bind(after)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        let next = if rows.len() == limit {
            rows.last().map(|r| r.row_key.clone())
        } else {
            None
        };

        Ok(RecordPage {
            records: rows.into_iter().map(ProfileRow::into_record).collect(),
            next,
        })
    }
}

/// Row type for SQLite queries
#[derive(sqlx::FromRow)]
struct ProfileRow {
    partition_key: String,
    row_key: String,
    name: String,
    description: String,
    linkedin: String,
    github: String,
    skills: String,
    updated_at: Option<String>,
}

impl ProfileRow {
    fn into_record(self) -> ProfileRecord {
        ProfileRecord {
            timestamp: self.updated_at.as_deref().and_then(parse_timestamp),
            partition_key: self.partition_key,
            row_key: self.row_key,
            name: self.name,
            description: self.description,
            linkedin: self.linkedin,
            github: self.github,
            skills: self.skills,
        }
    }
}

/// Accepts RFC 3339 as well as SQLite's `datetime('now')` format
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}
