//! Database module providing PostgreSQL connection pooling and the
//! tournament repositories.
//!
//! This module manages the database connection pool using sqlx and exposes
//! the [`TournamentRepository`] seam with its PostgreSQL and in-memory
//! implementations.

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

pub mod config;
pub mod memory;
pub mod postgres;
pub mod repository;
pub mod timeouts;

pub use config::DatabaseConfig;
pub use memory::MemoryTournamentRepository;
pub use postgres::PgTournamentRepository;
pub use repository::TournamentRepository;

/// Idempotent schema for teams, groups, memberships and matches
const SCHEMA: &str = include_str!("../../migrations/001_tournament.sql");

/// Database connection pool wrapper
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool
    ///
    /// # Arguments
    ///
    /// * `config` - Database configuration
    ///
    /// # Returns
    ///
    /// * `Result<Database, sqlx::Error>` - Database instance or error
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use robo_tournament::db::{Database, DatabaseConfig};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), sqlx::Error> {
    ///     let config = DatabaseConfig::from_env();
    ///     let db = Database::new(&config).await?;
    ///     db.ensure_schema().await?;
    ///     Ok(())
    /// }
    /// ```
    pub async fn new(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
            .connect(&config.database_url)
            .await?;

        log::info!(
            "Connected to database (pool {}..{})",
            config.min_connections,
            config.max_connections
        );

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create missing tables and indexes
    pub async fn ensure_schema(&self) -> Result<(), sqlx::Error> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        log::debug!("Tournament schema is in place");
        Ok(())
    }

    /// Repository backed by this pool
    pub fn repository(&self) -> PgTournamentRepository {
        PgTournamentRepository::new(self.pool.clone())
    }

    /// Check if the database connection is healthy
    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Close the database connection pool
    pub async fn close(self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_covers_every_table() {
        for table in ["teams", "tournament_groups", "group_teams", "matches"] {
            assert!(
                SCHEMA.contains(&format!("CREATE TABLE IF NOT EXISTS {table}")),
                "missing table {table}"
            );
        }
    }

    #[tokio::test]
    #[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
    async fn test_database_connection() {
        let config = DatabaseConfig::from_env();

        let db = Database::new(&config)
            .await
            .expect("Failed to connect to database");
        db.ensure_schema().await.expect("Schema creation failed");
        db.health_check().await.expect("Health check failed");
        db.close().await;
    }
}
