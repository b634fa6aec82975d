//! Seeding helpers shared by unit tests

use chrono::Utc;
use orion_common::db::DEFAULT_RATING;
use orion_common::Tier;
use sqlx::SqlitePool;
use uuid::Uuid;

pub async fn seed_film(pool: &SqlitePool, title: &str) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO films (id, title) VALUES (?, ?)")
        .bind(id.to_string())
        .bind(title)
        .execute(pool)
        .await
        .unwrap();
    id
}

/// Insert an entry at a raw position, bypassing the ledger
pub async fn seed_entry(pool: &SqlitePool, user_id: &str, film_id: Uuid, tier: Tier, position: i64) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO list_entries (id, user_id, film_id, tier, position, rating, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(id.to_string())
    .bind(user_id)
    .bind(film_id.to_string())
    .bind(tier.to_db())
    .bind(position)
    .bind(DEFAULT_RATING)
    .bind(Utc::now())
    .execute(pool)
    .await
    .unwrap();
    id
}

pub async fn seed_comparison(pool: &SqlitePool, user_id: &str, winner_film: Uuid, loser_film: Uuid) {
    sqlx::query(
        "INSERT INTO comparisons (id, user_id, winner_film_id, loser_film_id, created_at)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(user_id)
    .bind(winner_film.to_string())
    .bind(loser_film.to_string())
    .bind(Utc::now())
    .execute(pool)
    .await
    .unwrap();
}

pub async fn positions_by_tier(pool: &SqlitePool, user_id: &str) -> Vec<(i64, Tier)> {
    let rows: Vec<(i64, Option<String>)> =
        sqlx::query_as("SELECT position, tier FROM list_entries WHERE user_id = ? ORDER BY position")
            .bind(user_id)
            .fetch_all(pool)
            .await
            .unwrap();
    rows.into_iter()
        .map(|(position, tier)| (position, Tier::from_db(tier.as_deref())))
        .collect()
}

pub async fn ids_by_position(pool: &SqlitePool, user_id: &str) -> Vec<Uuid> {
    let rows: Vec<String> =
        sqlx::query_scalar("SELECT id FROM list_entries WHERE user_id = ? ORDER BY position")
            .bind(user_id)
            .fetch_all(pool)
            .await
            .unwrap();
    rows.iter().map(|id| Uuid::parse_str(id).unwrap()).collect()
}
