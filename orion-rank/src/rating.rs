//! Pairwise rating update
//!
//! Elo-style update applied to both films of every comparison. Ratings only
//! feed the internal ordering; they are never shown to the user.

use crate::error::Result;
use orion_common::db::get_f64_setting;
use sqlx::SqlitePool;

/// Default step size
pub const DEFAULT_K_FACTOR: f64 = 24.0;

/// Default logistic scale
pub const DEFAULT_SCALE: f64 = 400.0;

/// Settings keys in the `settings` table
pub const K_FACTOR_SETTING: &str = "rating_k_factor";
pub const SCALE_SETTING: &str = "rating_scale";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingParams {
    pub k: f64,
    pub scale: f64,
}

impl Default for RatingParams {
    fn default() -> Self {
        Self {
            k: DEFAULT_K_FACTOR,
            scale: DEFAULT_SCALE,
        }
    }
}

impl RatingParams {
    /// Load from the settings table; a non-positive scale falls back to the default
    pub async fn load(pool: &SqlitePool) -> Result<Self> {
        let k = get_f64_setting(pool, K_FACTOR_SETTING, DEFAULT_K_FACTOR).await?;
        let scale = get_f64_setting(pool, SCALE_SETTING, DEFAULT_SCALE).await?;
        let scale = if scale > 0.0 { scale } else { DEFAULT_SCALE };
        Ok(Self { k, scale })
    }

    pub fn apply(&self, winner: f64, loser: f64) -> (f64, f64) {
        update_ratings(winner, loser, self.k, self.scale)
    }
}

/// Expected score of A against B
pub fn expected_score(rating_a: f64, rating_b: f64, scale: f64) -> f64 {
    1.0 / (1.0 + 10f64.powf((rating_b - rating_a) / scale))
}

/// Returns `(winner', loser')` after one observed win
pub fn update_ratings(winner: f64, loser: f64, k: f64, scale: f64) -> (f64, f64) {
    let expected_winner = expected_score(winner, loser, scale);
    let expected_loser = 1.0 - expected_winner;
    (
        winner + k * (1.0 - expected_winner),
        loser + k * (0.0 - expected_loser),
    )
}
