//! Tier model queries
//!
//! A tier occupies a contiguous run of positions in the user's list, starting
//! right after the last entry of every higher tier. All queries exclude the
//! entry currently being placed.

use crate::error::Result;
use orion_common::db::{ListEntry, TIER_RANK_SQL};
use orion_common::Tier;
use sqlx::{Executor, Sqlite};
use uuid::Uuid;

/// First position of `tier`: one past the last entry of any higher tier, or 0
pub async fn tier_start<'e, E>(executor: E, user_id: &str, tier: Tier, exclude: Uuid) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!(
        "SELECT MAX(position) FROM list_entries
         WHERE user_id = ? AND id != ? AND ({}) < ?",
        TIER_RANK_SQL
    );

    let max: Option<i64> = sqlx::query_scalar(&sql)
        .bind(user_id)
        .bind(exclude.to_string())
        .bind(tier.rank())
        .fetch_one(executor)
        .await?;

    Ok(max.map(|m| m + 1).unwrap_or(0))
}

/// Number of entries in `tier`
pub async fn tier_size<'e, E>(executor: E, user_id: &str, tier: Tier, exclude: Uuid) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM list_entries WHERE user_id = ? AND tier IS ? AND id != ?",
    )
    .bind(user_id)
    .bind(tier.to_db())
    .bind(exclude.to_string())
    .fetch_one(executor)
    .await?;

    Ok(count)
}

/// Entry at 0-based in-tier `rank`, best first
pub async fn entry_at_rank<'e, E>(
    executor: E,
    user_id: &str,
    tier: Tier,
    exclude: Uuid,
    rank: i64,
) -> Result<Option<ListEntry>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query(
        "SELECT id, user_id, film_id, tier, position, rating, watched_at, created_at
         FROM list_entries
         WHERE user_id = ? AND tier IS ? AND id != ?
         ORDER BY position ASC
         LIMIT 1 OFFSET ?",
    )
    .bind(user_id)
    .bind(tier.to_db())
    .bind(exclude.to_string())
    .bind(rank)
    .fetch_optional(executor)
    .await?;

    row.map(|r| ListEntry::from_row(&r))
        .transpose()
        .map_err(Into::into)
}
