//! Ranking engine
//!
//! Drives one entry through `AwaitingTier -> Comparing -> Done`. Every
//! operation takes the caller's stored [`InsertionSession`] and returns a
//! [`RankingStep`] holding the view to present and the session to store
//! for the next request (`None` clears it).

use crate::comparisons::{self, RatingChange};
use crate::entries::{self, FilmEntry};
use crate::error::{Error, Result};
use crate::films::{self, CatalogFilm};
use crate::ledger;
use crate::rating::RatingParams;
use crate::scoring;
use crate::session::{resolve_session, InsertionSession, SessionState, Verdict};
use crate::tier::{entry_at_rank, tier_size};
use chrono::NaiveDate;
use orion_common::db::{Comparison, Film};
use orion_common::Tier;
use serde::Serialize;
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// What the caller should present next
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionView {
    /// Ask the user for a tier
    AwaitingTier { target: FilmEntry },
    /// Ask the user to choose between target and candidate
    Comparing {
        target: FilmEntry,
        candidate: FilmEntry,
        tier: Tier,
        lo: i64,
        hi: i64,
    },
    /// The entry has been placed
    Finalized {
        target: FilmEntry,
        tier: Tier,
        rank_in_tier: i64,
    },
}

impl SessionView {
    pub fn target(&self) -> &FilmEntry {
        match self {
            SessionView::AwaitingTier { target }
            | SessionView::Comparing { target, .. }
            | SessionView::Finalized { target, .. } => target,
        }
    }
}

/// Result of one session operation
#[derive(Debug, Clone, PartialEq)]
pub struct RankingStep {
    pub view: SessionView,
    /// Session to store for the next request; `None` clears it
    pub session: Option<InsertionSession>,
}

/// Entry as shown in the ranked list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredEntry {
    #[serde(flatten)]
    pub item: FilmEntry,
    pub display_score: Option<f64>,
}

/// Outcome of adding a film to a list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AddedEntry {
    #[serde(flatten)]
    pub item: FilmEntry,
    /// False when the user already had this film
    pub created: bool,
}

#[derive(Clone)]
pub struct RankingEngine {
    pool: SqlitePool,
    params: RatingParams,
}

impl RankingEngine {
    pub fn new(pool: SqlitePool, params: RatingParams) -> Self {
        Self { pool, params }
    }

    /// Engine with rating parameters read from the settings table
    pub async fn load(pool: SqlitePool) -> Result<Self> {
        let params = RatingParams::load(&pool).await?;
        info!(k = params.k, scale = params.scale, "Loaded rating parameters");
        Ok(Self::new(pool, params))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn params(&self) -> RatingParams {
        self.params
    }

    // ------------------------------------------------------------------
    // Session operations
    //
    // Each operation runs in one transaction that holds the user's list
    // lock from the first read. A verdict, its rating update and the final
    // placement it leads to commit together or not at all.
    // ------------------------------------------------------------------

    async fn begin_locked(&self, user_id: &str) -> Result<Transaction<'static, Sqlite>> {
        let mut tx = self.pool.begin().await?;
        ledger::lock_user_list(&mut tx, user_id).await?;
        Ok(tx)
    }

    /// Begin ranking an entry, or resume the stored session for it
    pub async fn start_ranking(
        &self,
        user_id: &str,
        entry_id: Uuid,
        stored: Option<InsertionSession>,
    ) -> Result<RankingStep> {
        let mut tx = self.begin_locked(user_id).await?;
        let target = entries::fetch_film_entry(&mut tx, user_id, entry_id).await?;

        let step = match resolve_session(stored, entry_id) {
            Some(session) => advance(&mut tx, user_id, target, session).await?,
            None => RankingStep {
                view: SessionView::AwaitingTier { target },
                session: None,
            },
        };

        tx.commit().await?;
        Ok(step)
    }

    /// Record the user's tier choice and open a search over that tier
    ///
    /// Any stored session for the entry is replaced. An empty tier finalizes
    /// immediately at the tier start.
    pub async fn set_tier(
        &self,
        user_id: &str,
        entry_id: Uuid,
        tier: Tier,
        _stored: Option<InsertionSession>,
    ) -> Result<RankingStep> {
        if tier == Tier::Unset {
            return Err(Error::InvalidTier(tier.to_string()));
        }

        let mut tx = self.begin_locked(user_id).await?;
        let target = entries::fetch_film_entry(&mut tx, user_id, entry_id).await?;
        let size = tier_size(&mut *tx, user_id, tier, entry_id).await?;
        let session = InsertionSession::begin(entry_id, tier, size);

        debug!(user = %user_id, entry = %entry_id, tier = %tier, tier_size = size, "Tier selected");
        let step = advance(&mut tx, user_id, target, session).await?;

        tx.commit().await?;
        Ok(step)
    }

    /// Parse a tier name and apply [`Self::set_tier`]
    pub async fn set_tier_str(
        &self,
        user_id: &str,
        entry_id: Uuid,
        tier: &str,
        stored: Option<InsertionSession>,
    ) -> Result<RankingStep> {
        let tier: Tier = tier
            .parse()
            .map_err(|_| Error::InvalidTier(tier.to_string()))?;
        self.set_tier(user_id, entry_id, tier, stored).await
    }

    /// Apply the user's choice between target and current candidate
    ///
    /// Without a matching session this is a no-op returning the tier prompt.
    /// A finished session goes straight to finalization. `shown_candidate` is
    /// the candidate the user was shown; when it is not the current candidate
    /// the verdict is a replay of an earlier step and is discarded.
    ///
    /// Nothing is written unless the whole step succeeds, so a failed call
    /// can be retried with the same stored session.
    pub async fn submit_verdict(
        &self,
        user_id: &str,
        entry_id: Uuid,
        verdict: Verdict,
        shown_candidate: Uuid,
        stored: Option<InsertionSession>,
    ) -> Result<RankingStep> {
        let mut tx = self.begin_locked(user_id).await?;
        let step = self
            .apply_verdict(&mut tx, user_id, entry_id, verdict, shown_candidate, stored)
            .await?;
        tx.commit().await?;
        Ok(step)
    }

    async fn apply_verdict(
        &self,
        conn: &mut SqliteConnection,
        user_id: &str,
        entry_id: Uuid,
        verdict: Verdict,
        shown_candidate: Uuid,
        stored: Option<InsertionSession>,
    ) -> Result<RankingStep> {
        let target = entries::fetch_film_entry(conn, user_id, entry_id).await?;

        let session = match resolve_session(stored, entry_id) {
            Some(session) => session,
            None => {
                warn!(user = %user_id, entry = %entry_id, "Verdict without an active session ignored");
                return Ok(RankingStep {
                    view: SessionView::AwaitingTier { target },
                    session: None,
                });
            }
        };

        let size = tier_size(&mut *conn, user_id, session.tier, entry_id).await?;
        let session = session.clamp(size);

        let mid = match session.state() {
            SessionState::Comparing { mid } => mid,
            SessionState::Done { .. } => return advance(conn, user_id, target, session).await,
        };

        let candidate = match entry_at_rank(&mut *conn, user_id, session.tier, entry_id, mid).await? {
            Some(candidate) => candidate,
            None => return advance(conn, user_id, target, session).await,
        };

        if shown_candidate != candidate.id {
            warn!(
                user = %user_id,
                entry = %entry_id,
                shown = %shown_candidate,
                current = %candidate.id,
                "Discarding verdict for a stale candidate"
            );
            return advance(conn, user_id, target, session).await;
        }

        let (winner, loser) = match verdict {
            Verdict::TargetWins => (entry_id, candidate.id),
            Verdict::CandidateWins => (candidate.id, entry_id),
        };
        let (_, change) =
            comparisons::record_verdict(conn, user_id, winner, loser, self.params).await?;
        log_verdict(user_id, entry_id, verdict, mid, &change);

        let next = session.apply(verdict);
        let target = entries::fetch_film_entry(conn, user_id, entry_id).await?;
        advance(conn, user_id, target, next).await
    }

    // ------------------------------------------------------------------
    // List operations
    // ------------------------------------------------------------------

    /// Remove an entry from the user's list
    pub async fn remove_entry(&self, user_id: &str, entry_id: Uuid) -> Result<()> {
        ledger::remove_at(&self.pool, user_id, entry_id).await?;
        Ok(())
    }

    /// The user's list in position order with derived display scores
    pub async fn list_view(&self, user_id: &str) -> Result<Vec<ScoredEntry>> {
        let items = entries::list_film_entries(&self.pool, user_id).await?;
        let tiers: Vec<Tier> = items.iter().map(|fe| fe.entry.tier).collect();
        let scores = scoring::score_list(&tiers);

        Ok(items
            .into_iter()
            .zip(scores)
            .map(|(item, display_score)| ScoredEntry { item, display_score })
            .collect())
    }

    /// Add a film by title and optional year, appending it to the list
    pub async fn add_film(
        &self,
        user_id: &str,
        title: &str,
        year: Option<i32>,
        watched_at: Option<NaiveDate>,
    ) -> Result<AddedEntry> {
        let (film, _) = films::get_or_create_by_title(&self.pool, title, year).await?;
        self.add_entry(user_id, film, watched_at).await
    }

    /// Add a film known to the external catalog
    pub async fn add_catalog_film(&self, user_id: &str, catalog: &CatalogFilm) -> Result<AddedEntry> {
        let (film, _) = films::get_or_create_by_tmdb(&self.pool, catalog).await?;
        self.add_entry(user_id, film, None).await
    }

    async fn add_entry(
        &self,
        user_id: &str,
        film: Film,
        watched_at: Option<NaiveDate>,
    ) -> Result<AddedEntry> {
        let (entry, created) = ledger::append(&self.pool, user_id, film.id, watched_at).await?;
        Ok(AddedEntry {
            item: FilmEntry { entry, film },
            created,
        })
    }

    /// The user's comparison audit trail, newest first
    pub async fn comparison_history(&self, user_id: &str, limit: i64) -> Result<Vec<Comparison>> {
        comparisons::history(&self.pool, user_id, limit.clamp(1, 1000)).await
    }
}

/// Present the next comparison, or place the entry when the search is over
async fn advance(
    conn: &mut SqliteConnection,
    user_id: &str,
    target: FilmEntry,
    session: InsertionSession,
) -> Result<RankingStep> {
    let entry_id = target.entry.id;
    let size = tier_size(&mut *conn, user_id, session.tier, entry_id).await?;
    let session = session.clamp(size);

    if let SessionState::Comparing { mid } = session.state() {
        if let Some(candidate) = entry_at_rank(&mut *conn, user_id, session.tier, entry_id, mid).await? {
            let film = films::fetch_film(&mut *conn, candidate.film_id).await?;
            return Ok(RankingStep {
                view: SessionView::Comparing {
                    target,
                    candidate: FilmEntry {
                        entry: candidate,
                        film,
                    },
                    tier: session.tier,
                    lo: session.lo,
                    hi: session.hi,
                },
                session: Some(session),
            });
        }
    }

    let rank = match session.state() {
        SessionState::Done { rank } => rank,
        SessionState::Comparing { .. } => session.lo,
    };
    let entry = ledger::insert_at(conn, user_id, entry_id, session.tier, rank).await?;

    Ok(RankingStep {
        view: SessionView::Finalized {
            target: FilmEntry {
                entry,
                film: target.film,
            },
            tier: session.tier,
            rank_in_tier: rank,
        },
        session: None,
    })
}

fn log_verdict(user_id: &str, entry_id: Uuid, verdict: Verdict, mid: i64, change: &RatingChange) {
    debug!(
        user = %user_id,
        entry = %entry_id,
        ?verdict,
        mid,
        winner_rating = change.winner_after,
        loser_rating = change.loser_after,
        "Verdict applied"
    );
}
