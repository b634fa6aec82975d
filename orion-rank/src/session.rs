//! Insertion session: binary search over pairwise verdicts
//!
//! A session narrows the half-open interval `[lo, hi)` of candidate in-tier
//! ranks for one entry. It is a plain value: the caller stores it between
//! requests and hands it back on the next one. No database access here.

use orion_common::Tier;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

/// User judgment between the entry being placed and the current candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// The entry being placed is preferred
    TargetWins,
    /// The candidate already in the list is preferred
    CandidateWins,
}

/// Where a session stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Compare the target against the tier entry at in-tier rank `mid`
    Comparing { mid: i64 },
    /// Search finished; insert at in-tier rank `rank`
    Done { rank: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertionSession {
    pub entry_id: Uuid,
    pub tier: Tier,
    pub lo: i64,
    pub hi: i64,
}

impl InsertionSession {
    /// Fresh search over a tier holding `tier_size` other entries
    pub fn begin(entry_id: Uuid, tier: Tier, tier_size: i64) -> Self {
        Self {
            entry_id,
            tier,
            lo: 0,
            hi: tier_size.max(0),
        }
    }

    pub fn matches(&self, entry_id: Uuid) -> bool {
        self.entry_id == entry_id
    }

    /// Shrink the bounds to a tier that may have lost entries since the last step
    pub fn clamp(self, tier_size: i64) -> Self {
        let hi = self.hi.min(tier_size.max(0)).max(0);
        let lo = self.lo.max(0).min(hi);
        Self { lo, hi, ..self }
    }

    pub fn state(&self) -> SessionState {
        if self.lo < self.hi {
            SessionState::Comparing {
                mid: (self.lo + self.hi) / 2,
            }
        } else {
            SessionState::Done { rank: self.lo }
        }
    }

    /// Narrow the interval; a finished session is returned unchanged
    pub fn apply(self, verdict: Verdict) -> Self {
        match self.state() {
            SessionState::Comparing { mid } => match verdict {
                Verdict::TargetWins => Self { hi: mid, ..self },
                Verdict::CandidateWins => Self { lo: mid + 1, ..self },
            },
            SessionState::Done { .. } => self,
        }
    }
}

/// Drop a stored session that belongs to another entry
pub fn resolve_session(stored: Option<InsertionSession>, entry_id: Uuid) -> Option<InsertionSession> {
    match stored {
        Some(session) if session.matches(entry_id) => Some(session),
        Some(session) => {
            warn!(
                stored_entry = %session.entry_id,
                requested_entry = %entry_id,
                "Ignoring stale insertion session"
            );
            None
        }
        None => None,
    }
}
