//! Display scores
//!
//! Maps an entry's rank within its tier onto that tier's slice of the 0-10
//! scale. Derived on every read from positions; ratings play no part.

use orion_common::Tier;

/// Score range covered by one tier
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreBand {
    pub low: f64,
    pub high: f64,
}

impl ScoreBand {
    pub fn midpoint(&self) -> f64 {
        (self.low + self.high) / 2.0
    }
}

/// Band for a tier; unset entries have none
pub fn band(tier: Tier) -> Option<ScoreBand> {
    match tier {
        Tier::Liked => Some(ScoreBand { low: 6.67, high: 10.0 }),
        Tier::Ok => Some(ScoreBand { low: 3.33, high: 6.67 }),
        Tier::Disliked => Some(ScoreBand { low: 0.0, high: 3.33 }),
        Tier::Unset => None,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Score of the entry at 0-based `rank` in a tier of `count` entries
pub fn display_score(tier: Tier, rank: usize, count: usize) -> Option<f64> {
    let band = band(tier)?;
    match count {
        0 => None,
        1 => Some(round2(band.midpoint())),
        n => {
            let t = rank.min(n - 1) as f64 / (n - 1) as f64;
            Some(round2(band.high - t * (band.high - band.low)))
        }
    }
}

/// Scores for a whole list given its tiers in position order
pub fn score_list(tiers: &[Tier]) -> Vec<Option<f64>> {
    let count_of = |tier: Tier| tiers.iter().filter(|t| **t == tier).count();
    let counts = [
        count_of(Tier::Liked),
        count_of(Tier::Ok),
        count_of(Tier::Disliked),
    ];

    let mut seen = [0usize; 3];
    tiers
        .iter()
        .map(|tier| match tier {
            Tier::Unset => None,
            tier => {
                let slot = tier.rank() as usize;
                let rank = seen[slot];
                seen[slot] += 1;
                display_score(*tier, rank, counts[slot])
            }
        })
        .collect()
}
