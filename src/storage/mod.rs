//! Storage capabilities - the record store and the object store
//!
//! The resolver only ever sees these two traits. Concrete backends are
//! created once at startup and shared read-only across requests.

pub mod objects;
pub mod records;

use thiserror::Error;

pub use objects::{
    create_object_store, HttpObjectStore, LocalObjectStore, MemoryObjectStore, ObjectStore,
    ObjectStoreBackend,
};
pub use records::{ProfileRecord, RecordPage, RecordStore, SqliteRecordStore};

/// Errors raised by either backing store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unexpected status {status} for {key}")]
    UnexpectedStatus { status: u16, key: String },

    #[error("invalid object url: {0}")]
    InvalidUrl(String),
}
