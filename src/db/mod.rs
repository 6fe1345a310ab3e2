//! Spatial index access
//!
//! The coverage indexes live in a single SQLite database with the
//! SpatiaLite extension providing geometry types and containment
//! predicates. The extension is loaded through the connect options so
//! every pooled connection has it; statements run in autocommit.

pub mod coverage;

pub use coverage::{CoverageRecord, CoverageSource};

use std::path::Path;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use crate::error::Result;

/// Connection pool over the SpatiaLite-enabled index database
#[derive(Debug, Clone)]
pub struct SpatialDb {
    pool: SqlitePool,
}

impl SpatialDb {
    /// Opens the index database, loading the SpatiaLite module on every
    /// connection
    pub async fn connect(db_path: &Path, spatialite: &Path) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .extension(spatialite.display().to_string());
        Self::with_options(options).await
    }

    /// Opens a plain in-memory database, without the spatial extension
    ///
    /// Capped at one connection: every `:memory:` connection is its own
    /// database, so a wider pool would not see the created tables.
    pub async fn connect_in_memory() -> Result<Self> {
        Self::pooled(SqliteConnectOptions::new().in_memory(true), 1).await
    }

    async fn with_options(options: SqliteConnectOptions) -> Result<Self> {
        Self::pooled(options, 4).await
    }

    async fn pooled(options: SqliteConnectOptions, max_connections: u32) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }

    /// The underlying pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Lists the user tables, equivalent to ".tables" in the sqlite3 CLI
    pub async fn tables(&self) -> Result<Vec<String>> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT name FROM sqlite_master WHERE type = 'table';")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(|(name,)| name).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_roundtrip() {
        let db = SpatialDb::connect_in_memory().await.unwrap();
        sqlx::query("CREATE TABLE t (id INTEGER);")
            .execute(db.pool())
            .await
            .unwrap();
        assert_eq!(db.tables().await.unwrap(), vec!["t".to_string()]);
    }
}
