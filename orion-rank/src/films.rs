//! Film records
//!
//! Films are created on first reference, either by TMDB id or by
//! `(title, year)`, and are never duplicated for the same TMDB id. Optional
//! metadata is only ever backfilled, never overwritten.

use crate::error::{Error, Result};
use orion_common::db::Film;
use orion_common::Tier;
use sqlx::{Executor, Row, Sqlite, SqlitePool};
use std::collections::HashMap;
use tracing::{debug, info};
use uuid::Uuid;

const FILM_COLUMNS: &str = "id, title, year, tmdb_id, poster_path, director";

/// Maximum stored title length
pub const MAX_TITLE_LEN: usize = 255;

/// Earliest and latest plausible release years
pub const MIN_YEAR: i32 = 1888;
pub const MAX_YEAR: i32 = 3000;

/// Trimmed, non-empty title of bounded length
pub fn validate_title(title: &str) -> Result<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(Error::InvalidInput("Missing title".to_string()));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(Error::InvalidInput(format!(
            "Title longer than {} characters",
            MAX_TITLE_LEN
        )));
    }
    Ok(title.to_string())
}

pub fn validate_year(year: Option<i32>) -> Result<Option<i32>> {
    match year {
        Some(y) if !(MIN_YEAR..=MAX_YEAR).contains(&y) => Err(Error::InvalidInput(format!(
            "Please enter a realistic year (got {})",
            y
        ))),
        other => Ok(other),
    }
}

pub async fn fetch_film<'e, E>(executor: E, film_id: Uuid) -> Result<Film>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query(&format!("SELECT {} FROM films WHERE id = ?", FILM_COLUMNS))
        .bind(film_id.to_string())
        .fetch_optional(executor)
        .await?
        .ok_or(orion_common::Error::FilmNotFound(film_id))?;

    Ok(Film::from_row(&row)?)
}

/// Find or create a film by `(title, year)`
pub async fn get_or_create_by_title(pool: &SqlitePool, title: &str, year: Option<i32>) -> Result<(Film, bool)> {
    let title = validate_title(title)?;
    let year = validate_year(year)?;

    let mut tx = pool.begin().await?;

    let existing = sqlx::query(&format!(
        "SELECT {} FROM films WHERE title = ? AND year IS ? ORDER BY created_at ASC LIMIT 1",
        FILM_COLUMNS
    ))
    .bind(&title)
    .bind(year)
    .fetch_optional(&mut *tx)
    .await?;

    if let Some(row) = existing {
        tx.commit().await?;
        return Ok((Film::from_row(&row)?, false));
    }

    let film = Film {
        id: Uuid::new_v4(),
        title,
        year,
        tmdb_id: None,
        poster_path: None,
        director: None,
    };

    sqlx::query("INSERT INTO films (id, title, year) VALUES (?, ?, ?)")
        .bind(film.id.to_string())
        .bind(&film.title)
        .bind(film.year)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    info!(film = %film.id, title = %film.label(), "Created film");
    Ok((film, true))
}

/// Metadata offered by the catalog for a TMDB film
#[derive(Debug, Clone, Default)]
pub struct CatalogFilm {
    pub tmdb_id: i64,
    pub title: String,
    pub year: Option<i32>,
    pub poster_path: Option<String>,
    pub director: Option<String>,
}

/// Find or create a film by TMDB id, backfilling missing metadata
pub async fn get_or_create_by_tmdb(pool: &SqlitePool, catalog: &CatalogFilm) -> Result<(Film, bool)> {
    let title = validate_title(&catalog.title)?;
    let year = validate_year(catalog.year)?;
    let poster_path = catalog
        .poster_path
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty());
    let director = catalog
        .director
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty());

    let mut tx = pool.begin().await?;

    let inserted = sqlx::query(
        "INSERT OR IGNORE INTO films (id, title, year, tmdb_id, poster_path, director)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(&title)
    .bind(year)
    .bind(catalog.tmdb_id)
    .bind(poster_path)
    .bind(director)
    .execute(&mut *tx)
    .await?
    .rows_affected()
        > 0;

    if !inserted {
        // Only NULL columns are filled in
        sqlx::query(
            "UPDATE films SET
                year = COALESCE(year, ?),
                poster_path = COALESCE(poster_path, ?),
                director = COALESCE(director, ?)
             WHERE tmdb_id = ?",
        )
        .bind(year)
        .bind(poster_path)
        .bind(director)
        .bind(catalog.tmdb_id)
        .execute(&mut *tx)
        .await?;
    }

    let row = sqlx::query(&format!("SELECT {} FROM films WHERE tmdb_id = ?", FILM_COLUMNS))
        .bind(catalog.tmdb_id)
        .fetch_one(&mut *tx)
        .await?;
    let film = Film::from_row(&row)?;

    tx.commit().await?;

    if inserted {
        info!(film = %film.id, tmdb_id = catalog.tmdb_id, title = %film.label(), "Created film from catalog");
    } else {
        debug!(film = %film.id, tmdb_id = catalog.tmdb_id, "Reused catalog film");
    }
    Ok((film, inserted))
}

/// The user's entries for catalog films, keyed by TMDB id
pub async fn owned_by_tmdb(pool: &SqlitePool, user_id: &str) -> Result<HashMap<i64, (Uuid, Tier)>> {
    let rows = sqlx::query(
        "SELECT f.tmdb_id, e.id, e.tier
         FROM list_entries e
         JOIN films f ON f.id = e.film_id
         WHERE e.user_id = ? AND f.tmdb_id IS NOT NULL",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    let mut owned = HashMap::with_capacity(rows.len());
    for row in rows {
        let tmdb_id: i64 = row.try_get("tmdb_id")?;
        let entry_id: String = row.try_get("id")?;
        let tier: Option<String> = row.try_get("tier")?;
        let entry_id = Uuid::parse_str(&entry_id)
            .map_err(|e| orion_common::Error::corrupt("id", e))?;
        owned.insert(tmdb_id, (entry_id, Tier::from_db(tier.as_deref())));
    }
    Ok(owned)
}
