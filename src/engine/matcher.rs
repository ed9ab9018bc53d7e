//! Pairing entry legs with exit legs over a snapshot of the active set.
//!
//! The planner is pure: it never mutates stores. The ingestion pass feeds it
//! the current active legs and settles each planned pair atomically, so a
//! leg can never be consumed twice: within one plan the planner itself
//! guarantees disjointness, across passes the settle transaction does.

use crate::domain::{sort_legs_oldest_first, Decimal, TradeLeg};
use tracing::{debug, warn};

/// Matching tolerances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchConfig {
    /// Maximum relative amount difference between entry and exit:
    /// `|a - b| / ((a + b) / 2)`. Inclusive boundary.
    pub amount_tolerance: Decimal,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            amount_tolerance: Decimal::from_str_canonical("0.25").expect("valid decimal"),
        }
    }
}

/// An (entry, exit) pairing produced by one planning pass.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedMatch {
    pub entry: TradeLeg,
    pub exit: TradeLeg,
}

/// Finds valid (entry, exit) pairings over the active set.
#[derive(Debug, Clone, Default)]
pub struct MatchPlanner {
    config: MatchConfig,
}

impl MatchPlanner {
    pub fn new(config: MatchConfig) -> Self {
        Self { config }
    }

    /// Plan pairings over a snapshot of the active set.
    ///
    /// Entries are scanned oldest-first; each picks its best eligible exit
    /// (earliest signal, then closest amount, then leg id). No leg appears
    /// in more than one returned pair. Entries without an eligible exit are
    /// simply not returned; they stay active and are retried next pass.
    pub fn plan(&self, active: &[TradeLeg]) -> Vec<PlannedMatch> {
        let mut entries: Vec<TradeLeg> = active
            .iter()
            .filter(|leg| leg.is_entry() && leg.status.is_matchable())
            .cloned()
            .collect();
        sort_legs_oldest_first(&mut entries);

        let exits: Vec<TradeLeg> = active
            .iter()
            .filter(|leg| !leg.is_entry() && leg.status.is_matchable())
            .cloned()
            .collect();

        let mut consumed = vec![false; exits.len()];
        let mut planned = Vec::new();

        for entry in entries {
            let Some(best) = self.best_exit(&entry, &exits, &consumed) else {
                debug!(leg_id = %entry.leg_id, pair = %entry.token_pair, "No eligible exit yet");
                continue;
            };

            // Last line of defense: the eligibility predicate already
            // rejects non-positive amounts, so tripping this means the
            // predicate regressed. The pair is discarded and both legs
            // remain active.
            if !entry.amount_usdc.is_positive() || !exits[best].amount_usdc.is_positive() {
                warn!(
                    entry_leg = %entry.leg_id,
                    exit_leg = %exits[best].leg_id,
                    "Discarding pairing with non-positive amount"
                );
                continue;
            }

            consumed[best] = true;
            planned.push(PlannedMatch {
                entry,
                exit: exits[best].clone(),
            });
        }

        planned
    }

    fn best_exit(
        &self,
        entry: &TradeLeg,
        exits: &[TradeLeg],
        consumed: &[bool],
    ) -> Option<usize> {
        let mut best: Option<(usize, (i64, Decimal, String))> = None;

        for (idx, exit) in exits.iter().enumerate() {
            if consumed[idx] || !self.eligible(entry, exit) {
                continue;
            }

            let score = (
                exit.signal_ts.as_secs(),
                (entry.amount_usdc - exit.amount_usdc).abs(),
                exit.leg_id.clone(),
            );
            let better = match &best {
                Some((_, current)) => score < *current,
                None => true,
            };
            if better {
                best = Some((idx, score));
            }
        }

        best.map(|(idx, _)| idx)
    }

    /// Eligibility predicate for a candidate exit given an entry.
    fn eligible(&self, entry: &TradeLeg, exit: &TradeLeg) -> bool {
        if entry.token_pair != exit.token_pair {
            return false;
        }
        if entry.network != exit.network {
            return false;
        }
        if exit.signal_ts < entry.signal_ts {
            return false;
        }
        // Zero or negative amounts never match: protects both the relative
        // difference below (division by the mean) and downstream P&L math.
        if !entry.amount_usdc.is_positive() || !exit.amount_usdc.is_positive() {
            return false;
        }

        let mean = (entry.amount_usdc + exit.amount_usdc) / Decimal::two();
        let relative = (entry.amount_usdc - exit.amount_usdc).abs() / mean;
        relative <= self.config.amount_tolerance
    }
}
