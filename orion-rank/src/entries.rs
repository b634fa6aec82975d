//! List entry queries

use crate::error::{Error, Result};
use orion_common::db::{Film, ListEntry};
use serde::Serialize;
use sqlx::{Executor, Row, Sqlite, SqliteConnection, SqlitePool};
use uuid::Uuid;

/// Column list matching `ListEntry::from_row`
pub const ENTRY_COLUMNS: &str =
    "id, user_id, film_id, tier, position, rating, watched_at, created_at";

/// A list entry together with its film
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilmEntry {
    pub entry: ListEntry,
    pub film: Film,
}

/// Fetch one of the user's entries; another user's entry is reported as not found
pub async fn fetch_entry<'e, E>(executor: E, user_id: &str, entry_id: Uuid) -> Result<ListEntry>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query(&format!(
        "SELECT {} FROM list_entries WHERE id = ? AND user_id = ?",
        ENTRY_COLUMNS
    ))
    .bind(entry_id.to_string())
    .bind(user_id)
    .fetch_optional(executor)
    .await?
    .ok_or(Error::EntryNotFound(entry_id))?;

    Ok(ListEntry::from_row(&row)?)
}

/// Fetch an entry joined with its film
pub async fn fetch_film_entry(conn: &mut SqliteConnection, user_id: &str, entry_id: Uuid) -> Result<FilmEntry> {
    let entry = fetch_entry(&mut *conn, user_id, entry_id).await?;
    let film = crate::films::fetch_film(&mut *conn, entry.film_id).await?;
    Ok(FilmEntry { entry, film })
}

/// All of a user's entries with their films, in position order
pub async fn list_film_entries(pool: &SqlitePool, user_id: &str) -> Result<Vec<FilmEntry>> {
    let rows = sqlx::query(
        r#"
        SELECT e.id, e.user_id, e.film_id, e.tier, e.position, e.rating,
               e.watched_at, e.created_at,
               f.id AS f_id, f.title, f.year, f.tmdb_id, f.poster_path, f.director
        FROM list_entries e
        JOIN films f ON f.id = e.film_id
        WHERE e.user_id = ?
        ORDER BY e.position ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| -> Result<FilmEntry> {
            let entry = ListEntry::from_row(row)?;
            let film_id: String = row.try_get("f_id")?;
            let film = Film {
                id: Uuid::parse_str(&film_id)
                    .map_err(|e| orion_common::Error::corrupt("f_id", format!("{} ({})", film_id, e)))?,
                title: row.try_get("title")?,
                year: row.try_get("year")?,
                tmdb_id: row.try_get("tmdb_id")?,
                poster_path: row.try_get("poster_path")?,
                director: row.try_get("director")?,
            };
            Ok(FilmEntry { entry, film })
        })
        .collect()
}
