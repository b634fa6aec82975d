//! Comparison log and the paired rating update
//!
//! A verdict locks both entry rows, reads their ratings, writes both updated
//! ratings and appends the comparison record, all on the caller's
//! transaction. Nothing here is consulted by the insertion search.

use crate::error::{Error, Result};
use crate::rating::RatingParams;
use chrono::Utc;
use orion_common::db::Comparison;
use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

/// Ratings of both entries after a verdict
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingChange {
    pub winner_before: f64,
    pub loser_before: f64,
    pub winner_after: f64,
    pub loser_after: f64,
}

/// Record `winner_entry` beating `loser_entry` and update both ratings
///
/// `conn` must be inside a transaction; nothing is committed here.
pub async fn record_verdict(
    conn: &mut SqliteConnection,
    user_id: &str,
    winner_entry: Uuid,
    loser_entry: Uuid,
    params: RatingParams,
) -> Result<(Comparison, RatingChange)> {
    if winner_entry == loser_entry {
        return Err(Error::InvalidInput("An entry cannot be compared with itself".to_string()));
    }

    // Lock both rows before reading them
    sqlx::query("UPDATE list_entries SET rating = rating WHERE user_id = ? AND id IN (?, ?)")
        .bind(user_id)
        .bind(winner_entry.to_string())
        .bind(loser_entry.to_string())
        .execute(&mut *conn)
        .await?;

    let rows = sqlx::query("SELECT id, film_id, rating FROM list_entries WHERE user_id = ? AND id IN (?, ?)")
        .bind(user_id)
        .bind(winner_entry.to_string())
        .bind(loser_entry.to_string())
        .fetch_all(&mut *conn)
        .await?;

    let mut winner = None;
    let mut loser = None;
    for row in &rows {
        let id: String = row.try_get("id")?;
        let film_id: String = row.try_get("film_id")?;
        let rating: f64 = row.try_get("rating")?;
        if id == winner_entry.to_string() {
            winner = Some((film_id, rating));
        } else {
            loser = Some((film_id, rating));
        }
    }
    let (winner_film, winner_before) = winner.ok_or(Error::EntryNotFound(winner_entry))?;
    let (loser_film, loser_before) = loser.ok_or(Error::EntryNotFound(loser_entry))?;

    let (winner_after, loser_after) = params.apply(winner_before, loser_before);

    for (id, rating) in [(winner_entry, winner_after), (loser_entry, loser_after)] {
        sqlx::query("UPDATE list_entries SET rating = ? WHERE id = ?")
            .bind(rating)
            .bind(id.to_string())
            .execute(&mut *conn)
            .await?;
    }

    let comparison = Comparison {
        id: Uuid::new_v4(),
        user_id: user_id.to_string(),
        winner_film_id: parse_film_id(&winner_film)?,
        loser_film_id: parse_film_id(&loser_film)?,
        created_at: Utc::now(),
    };

    sqlx::query(
        "INSERT INTO comparisons (id, user_id, winner_film_id, loser_film_id, created_at)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(comparison.id.to_string())
    .bind(&comparison.user_id)
    .bind(&winner_film)
    .bind(&loser_film)
    .bind(comparison.created_at)
    .execute(&mut *conn)
    .await?;

    let change = RatingChange {
        winner_before,
        loser_before,
        winner_after,
        loser_after,
    };
    debug!(
        user = %user_id,
        winner = %winner_entry,
        loser = %loser_entry,
        winner_rating = winner_after,
        loser_rating = loser_after,
        "Recorded comparison"
    );
    Ok((comparison, change))
}

fn parse_film_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|e| orion_common::Error::corrupt("film_id", format!("{} ({})", raw, e)).into())
}

/// The user's comparisons, newest first
pub async fn history(pool: &SqlitePool, user_id: &str, limit: i64) -> Result<Vec<Comparison>> {
    let rows = sqlx::query(
        "SELECT id, user_id, winner_film_id, loser_film_id, created_at
         FROM comparisons
         WHERE user_id = ?
         ORDER BY created_at DESC, rowid DESC
         LIMIT ?",
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| Comparison::from_row(row).map_err(Into::into))
        .collect()
}
