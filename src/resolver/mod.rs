//! Name resolution and artifact discovery
//!
//! A query name is normalized (lowercased, all whitespace removed) and that
//! normalized key is the one identity used for matching: it is compared
//! against each candidate's normalized display name and it is the stem of
//! every object key. The record partition comes from the query's first
//! non-whitespace character, uppercased, the same way stored partitions are
//! derived from display names.
//!
//! The record's `name` field is authoritative for matching. Row keys are
//! only used as the scan cursor.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::storage::{ObjectStore, ProfileRecord, RecordStore, StoreError};

/// Photo extensions in probe order; the first one present wins
pub const PHOTO_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Resume extension, assumed present without probing
pub const RESUME_EXTENSION: &str = "pdf";

/// Resolution failures
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("name parameter is required")]
    MissingParameter,

    #[error("user not found")]
    NotFound,

    #[error("user photo not found")]
    ArtifactNotFound,

    /// Carries the store error for logging; its text is not part of Display
    #[error("backend unavailable")]
    BackendUnavailable(#[from] StoreError),
}

/// Resolver tuning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Object store container holding photos and resumes
    pub container: String,
    /// Maximum records examined per lookup
    pub max_scan: usize,
    /// Records fetched per store round trip
    pub page_size: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            container: "media-dev".to_string(),
            max_scan: 1000,
            page_size: 100,
        }
    }
}

/// Successful lookup payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    pub description: String,
    #[serde(rename = "linkedIn")]
    pub linkedin: String,
    #[serde(rename = "gitHub")]
    pub github: String,
    pub skills: String,
    #[serde(rename = "photoUrl")]
    pub photo_url: String,
    #[serde(rename = "resumeUrl")]
    pub resume_url: String,
}

impl UserProfile {
    fn from_record(record: ProfileRecord, photo_url: String, resume_url: String) -> Self {
        Self {
            name: record.name,
            description: record.description,
            linkedin: record.linkedin,
            github: record.github,
            skills: record.skills,
            photo_url,
            resume_url,
        }
    }
}

/// Canonical matching key: lowercase with every whitespace character removed
pub fn normalize(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Partition for a display name or raw query: its first non-whitespace
/// character, uppercased
pub fn partition_key(name: &str) -> Option<String> {
    name.chars()
        .find(|c| !c.is_whitespace())
        .map(|c| c.to_uppercase().collect())
}

/// Drop any query or fragment so a URL can be handed out publicly
fn strip_query(url: &str) -> &str {
    url.split(['?', '#']).next().unwrap_or(url)
}

/// Resolves query names to profiles using injected store capabilities
pub struct Resolver {
    records: Arc<dyn RecordStore>,
    objects: Arc<dyn ObjectStore>,
    config: ResolverConfig,
}

impl Resolver {
    pub fn new(
        records: Arc<dyn RecordStore>,
        objects: Arc<dyn ObjectStore>,
        config: ResolverConfig,
    ) -> Self {
        Self {
            records,
            objects,
            config,
        }
    }

    /// Resolve a raw query name to a profile with artifact URLs
    pub async fn resolve(&self, raw_query: Option<&str>) -> Result<UserProfile, ResolveError> {
        let raw = raw_query.unwrap_or_default();
        let key = normalize(raw);
        let Some(partition) = partition_key(raw) else {
            return Err(ResolveError::MissingParameter);
        };
        debug!("Resolving {:?} in partition {}", key, partition);

        let result = self.resolve_key(&partition, &key).await;
        if let Err(ResolveError::BackendUnavailable(e)) = &result {
            error!("Backend failure resolving {:?}: {}", key, e);
        }
        result
    }

    async fn resolve_key(&self, partition: &str, key: &str) -> Result<UserProfile, ResolveError> {
        let record = self.find_record(partition, key).await?;
        let photo_key = self.discover_photo(key).await?;

        let container = &self.config.container;
        let photo_url = self.objects.public_url(container, &photo_key)?;
        let resume_url = self
            .objects
            .public_url(container, &format!("{}.{}", key, RESUME_EXTENSION))?;

        Ok(UserProfile::from_record(
            record,
            strip_query(&photo_url).to_string(),
            strip_query(&resume_url).to_string(),
        ))
    }

    /// First record, in store order, whose normalized name equals `key`
    async fn find_record(&self, partition: &str, key: &str) -> Result<ProfileRecord, ResolveError> {
        let mut cursor: Option<String> = None;
        let mut scanned = 0usize;

        loop {
            let remaining = self.config.max_scan.saturating_sub(scanned);
            if remaining == 0 {
                warn!(
                    "Scan limit of {} records reached in partition {} without a match",
                    self.config.max_scan, partition
                );
                return Err(ResolveError::NotFound);
            }

            let limit = self.config.page_size.min(remaining);
            let page = self
                .records
                .scan_partition(partition, cursor.as_deref(), limit)
                .await?;

            if page.records.is_empty() {
                debug!("Partition {} exhausted after {} records", partition, scanned);
                return Err(ResolveError::NotFound);
            }
            scanned += page.records.len();

            if let Some(record) = page.records.into_iter().find(|r| normalize(&r.name) == key) {
                debug!(
                    "Matched record {}/{} (updated {:?})",
                    record.partition_key, record.row_key, record.timestamp
                );
                return Ok(record);
            }

            match page.next {
                Some(next) => cursor = Some(next),
                None => return Err(ResolveError::NotFound),
            }
        }
    }

    /// First photo key that exists, probing in extension order
    async fn discover_photo(&self, key: &str) -> Result<String, ResolveError> {
        for ext in PHOTO_EXTENSIONS {
            let candidate = format!("{}.{}", key, ext);
            if self.objects.exists(&self.config.container, &candidate).await? {
                debug!("Found photo {}", candidate);
                return Ok(candidate);
            }
        }
        Err(ResolveError::ArtifactNotFound)
    }
}
