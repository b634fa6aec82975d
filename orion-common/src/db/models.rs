//! Database models

use crate::{Error, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Default rating assigned to a new list entry
pub const DEFAULT_RATING: f64 = 1500.0;

/// Coarse preference bucket partitioning a user's list
///
/// Variant order is the list order: every `Liked` entry sits above every
/// `Ok` entry, and so on. `Unset` entries are pending placement and always
/// occupy the tail of the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Liked,
    Ok,
    Disliked,
    Unset,
}

impl Tier {
    /// Ordinal of the tier in list order
    pub fn rank(self) -> i64 {
        match self {
            Tier::Liked => 0,
            Tier::Ok => 1,
            Tier::Disliked => 2,
            Tier::Unset => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Liked => "liked",
            Tier::Ok => "ok",
            Tier::Disliked => "disliked",
            Tier::Unset => "unset",
        }
    }

    /// Column value; `Unset` is stored as NULL
    pub fn to_db(self) -> Option<&'static str> {
        match self {
            Tier::Unset => None,
            other => Some(other.as_str()),
        }
    }

    /// Parse a stored column value; unknown text is treated as unset
    pub fn from_db(value: Option<&str>) -> Self {
        value
            .and_then(|s| s.parse().ok())
            .unwrap_or(Tier::Unset)
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = Error;

    /// Only the selectable tiers parse; "unset" is not a valid choice.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "liked" => Ok(Tier::Liked),
            "ok" => Ok(Tier::Ok),
            "disliked" => Ok(Tier::Disliked),
            other => Err(Error::UnknownTier(other.to_string())),
        }
    }
}

/// SQL expression ranking the `tier` column in list order
pub const TIER_RANK_SQL: &str = "CASE tier \
    WHEN 'liked' THEN 0 \
    WHEN 'ok' THEN 1 \
    WHEN 'disliked' THEN 2 \
    ELSE 3 END";

fn parse_uuid(row: &SqliteRow, column: &'static str) -> Result<Uuid> {
    let raw: String = row.try_get(column)?;
    Uuid::parse_str(&raw).map_err(|e| Error::corrupt(column, format!("{} ({})", raw, e)))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Film {
    pub id: Uuid,
    pub title: String,
    pub year: Option<i32>,
    pub tmdb_id: Option<i64>,
    pub poster_path: Option<String>,
    pub director: Option<String>,
}

impl Film {
    pub fn from_row(row: &SqliteRow) -> Result<Self> {
        Ok(Self {
            id: parse_uuid(row, "id")?,
            title: row.try_get("title")?,
            year: row.try_get("year")?,
            tmdb_id: row.try_get("tmdb_id")?,
            poster_path: row.try_get("poster_path")?,
            director: row.try_get("director")?,
        })
    }

    /// "Title (Year)" when the year is known
    pub fn label(&self) -> String {
        match self.year {
            Some(year) => format!("{} ({})", self.title, year),
            None => self.title.clone(),
        }
    }
}

/// One film in one user's list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListEntry {
    pub id: Uuid,
    pub user_id: String,
    pub film_id: Uuid,
    pub tier: Tier,
    pub position: i64,
    pub rating: f64,
    pub watched_at: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl ListEntry {
    pub fn from_row(row: &SqliteRow) -> Result<Self> {
        let tier: Option<String> = row.try_get("tier")?;
        Ok(Self {
            id: parse_uuid(row, "id")?,
            user_id: row.try_get("user_id")?,
            film_id: parse_uuid(row, "film_id")?,
            tier: Tier::from_db(tier.as_deref()),
            position: row.try_get("position")?,
            rating: row.try_get("rating")?,
            watched_at: row.try_get("watched_at")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// Append-only record of one pairwise judgment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub id: Uuid,
    pub user_id: String,
    pub winner_film_id: Uuid,
    pub loser_film_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Comparison {
    pub fn from_row(row: &SqliteRow) -> Result<Self> {
        Ok(Self {
            id: parse_uuid(row, "id")?,
            user_id: row.try_get("user_id")?,
            winner_film_id: parse_uuid(row, "winner_film_id")?,
            loser_film_id: parse_uuid(row, "loser_film_id")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_order_is_list_order() {
        assert!(Tier::Liked < Tier::Ok);
        assert!(Tier::Ok < Tier::Disliked);
        assert!(Tier::Disliked < Tier::Unset);
        for pair in [Tier::Liked, Tier::Ok, Tier::Disliked, Tier::Unset].windows(2) {
            assert!(pair[0].rank() < pair[1].rank());
        }
    }

    #[test]
    fn test_tier_parse() {
        assert_eq!("liked".parse::<Tier>().unwrap(), Tier::Liked);
        assert_eq!(" OK ".parse::<Tier>().unwrap(), Tier::Ok);
        assert_eq!("disliked".parse::<Tier>().unwrap(), Tier::Disliked);
        assert!("unset".parse::<Tier>().is_err());
        assert!(matches!("great".parse::<Tier>(), Err(Error::UnknownTier(t)) if t == "great"));
    }

    #[test]
    fn test_tier_db_mapping() {
        assert_eq!(Tier::Unset.to_db(), None);
        assert_eq!(Tier::Ok.to_db(), Some("ok"));
        assert_eq!(Tier::from_db(None), Tier::Unset);
        assert_eq!(Tier::from_db(Some("disliked")), Tier::Disliked);
        assert_eq!(Tier::from_db(Some("garbage")), Tier::Unset);
    }

    #[test]
    fn test_film_label() {
        let mut film = Film {
            id: Uuid::new_v4(),
            title: "Heat".to_string(),
            year: Some(1995),
            tmdb_id: None,
            poster_path: None,
            director: None,
        };
        assert_eq!(film.label(), "Heat (1995)");
        film.year = None;
        assert_eq!(film.label(), "Heat");
    }
}
