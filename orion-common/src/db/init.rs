//! Database initialization
//!
//! Creates the database file on first run, sets per-connection options,
//! creates tables idempotently and seeds default settings.

use crate::{Error, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

/// Current schema version recorded in `schema_version`
pub const SCHEMA_VERSION: i64 = 1;

/// How long a connection waits for the write lock before failing
pub const BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

/// Default runtime settings: (key, value)
pub const DEFAULT_SETTINGS: &[(&str, &str)] = &[
    // Pairwise rating update
    ("rating_k_factor", "24.0"),
    ("rating_scale", "400.0"),
];

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| Error::folder(parent, e))?;
    }

    // Applied to every pooled connection. WAL allows concurrent readers
    // alongside the single writer.
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(BUSY_TIMEOUT)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    init_schema(&pool).await?;

    Ok(pool)
}

/// Open a private in-memory database with the full schema
///
/// A single connection is used so every query sees the same database; it is
/// never recycled, since closing it would discard the data.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    init_schema(&pool).await?;

    Ok(pool)
}

/// Create all tables and seed defaults (idempotent)
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    create_schema_version_table(pool).await?;
    create_settings_table(pool).await?;
    create_films_table(pool).await?;
    create_list_entries_table(pool).await?;
    create_comparisons_table(pool).await?;

    sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (?)")
        .bind(SCHEMA_VERSION)
        .execute(pool)
        .await?;

    init_default_settings(pool).await?;

    Ok(())
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_films_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS films (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            year INTEGER,
            tmdb_id INTEGER UNIQUE,
            poster_path TEXT,
            director TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_films_title_year ON films(title, year)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_list_entries_table(pool: &SqlitePool) -> Result<()> {
    // No UNIQUE(user_id, position): the ledger shifts positions row by row
    // inside a transaction, and SQLite checks uniqueness per row.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS list_entries (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            film_id TEXT NOT NULL REFERENCES films(id) ON DELETE CASCADE,
            tier TEXT CHECK (tier IN ('liked', 'ok', 'disliked')),
            position INTEGER NOT NULL CHECK (position >= 0),
            rating REAL NOT NULL DEFAULT 1500.0,
            watched_at DATE,
            created_at TIMESTAMP NOT NULL,
            UNIQUE (user_id, film_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_list_entries_user_position ON list_entries(user_id, position)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_comparisons_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS comparisons (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            winner_film_id TEXT NOT NULL REFERENCES films(id) ON DELETE CASCADE,
            loser_film_id TEXT NOT NULL REFERENCES films(id) ON DELETE CASCADE,
            created_at TIMESTAMP NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_comparisons_user ON comparisons(user_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Insert any missing default setting; existing values are left alone
async fn init_default_settings(pool: &SqlitePool) -> Result<()> {
    for &(key, default_value) in DEFAULT_SETTINGS {
        let inserted = sqlx::query("INSERT OR IGNORE INTO settings (key, value) VALUES (?, ?)")
            .bind(key)
            .bind(default_value)
            .execute(pool)
            .await?
            .rows_affected();

        if inserted > 0 {
            debug!("Initialized setting '{}' with default value: {}", key, default_value);
        }
    }

    Ok(())
}

/// Read a setting parsed as `f64`, falling back when missing or unparseable
pub async fn get_f64_setting(pool: &SqlitePool, key: &str, default: f64) -> Result<f64> {
    let value: Option<Option<String>> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await?;

    Ok(value
        .flatten()
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(default))
}

/// Write a setting (insert or replace)
pub async fn set_setting(pool: &SqlitePool, key: &str, value: &str) -> Result<()> {
    sqlx::query("INSERT OR REPLACE INTO settings (key, value) VALUES (?, ?)")
        .bind(key)
        .bind(value)
        .execute(pool)
        .await?;

    Ok(())
}
