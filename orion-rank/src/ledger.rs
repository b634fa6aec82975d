//! Position ledger
//!
//! The only writer of `list_entries.position`. `append` and `remove_at` run
//! in their own transaction. `insert_at` runs inside the caller's, so that a
//! final placement commits together with the verdict that produced it. Either
//! the whole renumbering lands or none of it does.
//!
//! SQLite has no `SELECT ... FOR UPDATE`. Each transaction therefore starts
//! with a no-op `UPDATE` over the user's rows, which takes the database write
//! lock before anything is read.

use crate::entries::{fetch_entry, ENTRY_COLUMNS};
use crate::error::Result;
use crate::tier::{tier_size, tier_start};
use chrono::{NaiveDate, Utc};
use orion_common::db::{ListEntry, DEFAULT_RATING, TIER_RANK_SQL};
use orion_common::Tier;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

/// Take the write lock on a user's list for the rest of the transaction
pub(crate) async fn lock_user_list(conn: &mut SqliteConnection, user_id: &str) -> Result<()> {
    sqlx::query("UPDATE list_entries SET position = position WHERE user_id = ?")
        .bind(user_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Rewrite the user's positions to `0..n-1` in `(tier, position)` order
///
/// Must be the last write of its transaction.
async fn renormalize(conn: &mut SqliteConnection, user_id: &str) -> Result<()> {
    let sql = format!(
        "SELECT id, position FROM list_entries
         WHERE user_id = ?
         ORDER BY ({}) ASC, position ASC, created_at ASC, id ASC",
        TIER_RANK_SQL
    );
    let rows: Vec<(String, i64)> = sqlx::query_as(&sql)
        .bind(user_id)
        .fetch_all(&mut *conn)
        .await?;

    let mut rewritten = 0;
    for (index, (id, position)) in rows.iter().enumerate() {
        let index = index as i64;
        if *position != index {
            sqlx::query("UPDATE list_entries SET position = ? WHERE id = ?")
                .bind(index)
                .bind(id)
                .execute(&mut *conn)
                .await?;
            rewritten += 1;
        }
    }

    debug!(user = %user_id, entries = rows.len(), rewritten, "Renormalized positions");
    Ok(())
}

/// Append a new, unranked entry at the tail of the user's list
///
/// Returns the existing entry untouched (apart from `watched_at`, when given)
/// if the user already has this film.
pub async fn append(
    pool: &SqlitePool,
    user_id: &str,
    film_id: Uuid,
    watched_at: Option<NaiveDate>,
) -> Result<(ListEntry, bool)> {
    let mut tx = pool.begin().await?;
    lock_user_list(&mut tx, user_id).await?;

    let existing = sqlx::query(&format!(
        "SELECT {} FROM list_entries WHERE user_id = ? AND film_id = ?",
        ENTRY_COLUMNS
    ))
    .bind(user_id)
    .bind(film_id.to_string())
    .fetch_optional(&mut *tx)
    .await?;

    if let Some(row) = existing {
        let mut entry = ListEntry::from_row(&row)?;
        if let Some(date) = watched_at {
            sqlx::query("UPDATE list_entries SET watched_at = ? WHERE id = ?")
                .bind(date)
                .bind(entry.id.to_string())
                .execute(&mut *tx)
                .await?;
            entry.watched_at = Some(date);
        }
        tx.commit().await?;
        return Ok((entry, false));
    }

    let max: Option<i64> = sqlx::query_scalar("SELECT MAX(position) FROM list_entries WHERE user_id = ?")
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;
    let position = max.map(|m| m + 1).unwrap_or(0);

    let entry = ListEntry {
        id: Uuid::new_v4(),
        user_id: user_id.to_string(),
        film_id,
        tier: Tier::Unset,
        position,
        rating: DEFAULT_RATING,
        watched_at,
        created_at: Utc::now(),
    };

    sqlx::query(
        r#"
        INSERT INTO list_entries (id, user_id, film_id, tier, position, rating, watched_at, created_at)
        VALUES (?, ?, ?, NULL, ?, ?, ?, ?)
        "#,
    )
    .bind(entry.id.to_string())
    .bind(&entry.user_id)
    .bind(entry.film_id.to_string())
    .bind(entry.position)
    .bind(entry.rating)
    .bind(entry.watched_at)
    .bind(entry.created_at)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    info!(user = %user_id, entry = %entry.id, position, "Appended list entry");
    Ok((entry, true))
}

/// Place `entry_id` at in-tier rank `rank` of `tier`
///
/// Shifts every other entry at or below the target slot down by one, stores
/// the new position and tier, then renormalizes the whole list. `rank` is
/// clamped to the current tier size. Returns the updated entry.
///
/// `conn` must be inside a transaction; nothing is committed here.
pub async fn insert_at(
    conn: &mut SqliteConnection,
    user_id: &str,
    entry_id: Uuid,
    tier: Tier,
    rank: i64,
) -> Result<ListEntry> {
    lock_user_list(conn, user_id).await?;

    // Ownership check under the lock
    fetch_entry(&mut *conn, user_id, entry_id).await?;

    let size = tier_size(&mut *conn, user_id, tier, entry_id).await?;
    let rank = rank.clamp(0, size);
    let target_position = tier_start(&mut *conn, user_id, tier, entry_id).await? + rank;

    sqlx::query(
        "UPDATE list_entries SET position = position + 1
         WHERE user_id = ? AND id != ? AND position >= ?",
    )
    .bind(user_id)
    .bind(entry_id.to_string())
    .bind(target_position)
    .execute(&mut *conn)
    .await?;

    sqlx::query("UPDATE list_entries SET position = ?, tier = ? WHERE id = ?")
        .bind(target_position)
        .bind(tier.to_db())
        .bind(entry_id.to_string())
        .execute(&mut *conn)
        .await?;

    renormalize(conn, user_id).await?;

    let entry = fetch_entry(&mut *conn, user_id, entry_id).await?;

    info!(
        user = %user_id,
        entry = %entry_id,
        tier = %tier,
        rank,
        position = entry.position,
        "Inserted entry into ranked list"
    );
    Ok(entry)
}

/// Remove an entry, its film's comparisons for this user, and close the gap
pub async fn remove_at(pool: &SqlitePool, user_id: &str, entry_id: Uuid) -> Result<ListEntry> {
    let mut tx = pool.begin().await?;
    lock_user_list(&mut tx, user_id).await?;

    let entry = fetch_entry(&mut *tx, user_id, entry_id).await?;

    sqlx::query("DELETE FROM list_entries WHERE id = ?")
        .bind(entry_id.to_string())
        .execute(&mut *tx)
        .await?;

    let film_id = entry.film_id.to_string();
    let comparisons = sqlx::query(
        "DELETE FROM comparisons
         WHERE user_id = ? AND (winner_film_id = ? OR loser_film_id = ?)",
    )
    .bind(user_id)
    .bind(&film_id)
    .bind(&film_id)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    sqlx::query(
        "UPDATE list_entries SET position = position - 1
         WHERE user_id = ? AND position > ?",
    )
    .bind(user_id)
    .bind(entry.position)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    info!(
        user = %user_id,
        entry = %entry_id,
        position = entry.position,
        comparisons,
        "Removed list entry"
    );
    Ok(entry)
}
