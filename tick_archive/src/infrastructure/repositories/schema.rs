// /////////////////////////////////////////////////////////////////////////////
// Tick Archive
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! SQLite schema helpers shared by repository implementations.
//!
//! Applies migrations on start-up so integration tests and services see a
//! consistent database: `environment_chunks` (C4/C7), `organisms` plus
//! strategy-selected `organism_states`/`organism_ticks` (C5).

use sqlx::migrate::MigrateDatabase;
use sqlx::SqlitePool;
use tracing::{debug, info};

/// Runs pending migrations against the provided SQLite pool.
pub async fn ensure_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    debug!("Ensuring database schema is up to date");

    // Run migrations - sqlx will automatically track what's been applied
    sqlx::migrate!("../migrations").run(pool).await?;

    info!("Database schema is up to date");
    Ok(())
}

/// Creates a new SQLite database file if it doesn't exist
///
/// This function is useful for ensuring the database file exists before
/// attempting to connect. SQLitePool::connect() will fail if the file
/// doesn't exist unless using SqliteConnectOptions with create_if_missing.
///
/// # Arguments
///
/// * `database_url` - SQLite connection URL (e.g., "sqlite://path/to/archive.db")
///
/// # Returns
///
/// * `Ok(())` - Database exists or was created successfully
/// * `Err(sqlx::Error)` - Failed to create database
pub async fn create_database_if_missing(database_url: &str) -> Result<(), sqlx::Error> {
    if !sqlx::Sqlite::database_exists(database_url).await? {
        debug!("Database does not exist, creating: {}", database_url);
        sqlx::Sqlite::create_database(database_url).await?;
        info!("Created new SQLite database: {}", database_url);
    } else {
        debug!("Database already exists: {}", database_url);
    }
    Ok(())
}

/// Initializes a new database with schema (convenience function)
///
/// This is a high-level function that combines database creation and
/// schema migration in one call. Perfect for application startup.
///
/// # Arguments
///
/// * `database_url` - SQLite connection URL
///
/// # Returns
///
/// * `Ok(SqlitePool)` - Connected pool with schema initialized
/// * `Err(sqlx::Error)` - Initialization failed
pub async fn initialize_database(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    // Create database if it doesn't exist
    create_database_if_missing(database_url).await?;

    // Connect to database
    let pool = SqlitePool::connect(database_url).await?;

    // Run migrations
    ensure_schema(&pool).await?;

    Ok(pool)
}
