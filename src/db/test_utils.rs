//! Shared test utilities for database operations
//!
//! Provides an in-memory pool with the full schema and a helper for
//! seeding profile rows, since the service itself has no write path.

use sqlx::SqlitePool;

use super::Database;

/// Create an in-memory test database pool with full schema
pub async fn test_pool() -> SqlitePool {
    let db = Database::new(None)
        .await
        .expect("Failed to create test database");
    db.pool().clone()
}

/// Insert a profile row keyed the way the record store expects
pub async fn insert_profile(pool: &SqlitePool, partition_key: &str, row_key: &str, name: &str) {
    sqlx::query(
        "INSERT INTO profiles (partition_key, row_key, name, description, linkedin, github, skills)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(partition_key)
    .bind(row_key)
    .bind(name)
    .bind(format!("About {}", name))
    .bind(format!("https://linkedin.com/in/{}", row_key))
    .bind(format!("https://github.com/{}", row_key))
    .bind(r#"["rust","sql"]"#)
    .execute(pool)
    .await
    .expect("Failed to insert profile");
}
