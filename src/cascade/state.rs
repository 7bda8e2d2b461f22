//! Cascade state
//!
//! Per-source, per-request record of which tiers were tried and why each was
//! left. The current tier only ever moves forward.

use serde::Serialize;

use crate::model::{ProvenanceTier, SourceKind};
use crate::profile::SourceSlot;

/// Why a tier attempt ended
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AttemptOutcome {
    Accepted { quality: f64 },
    Rejected { quality: f64, threshold: f64 },
    NotAvailable,
    Failed { reason: String },
    TimedOut,
    InsufficientNeighbors { found: usize, required: usize },
    NoBaseline,
}

impl AttemptOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, AttemptOutcome::Accepted { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierAttempt {
    pub tier: ProvenanceTier,
    pub outcome: AttemptOutcome,
}

/// Monotone tier cursor plus attempt log
#[derive(Debug, Clone)]
pub struct CascadeState {
    kind: SourceKind,
    current: ProvenanceTier,
    attempts: Vec<TierAttempt>,
}

impl CascadeState {
    pub fn new(kind: SourceKind) -> Self {
        Self {
            kind,
            current: ProvenanceTier::Primary,
            attempts: Vec::with_capacity(4),
        }
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    pub fn current(&self) -> ProvenanceTier {
        self.current
    }

    /// Record the outcome of the current tier. Returns true when the
    /// cascade should stop (accepted, or nothing left to try).
    pub fn record(&mut self, outcome: AttemptOutcome) -> bool {
        let accepted = outcome.is_accepted();
        self.attempts.push(TierAttempt {
            tier: self.current,
            outcome,
        });
        if accepted {
            return true;
        }
        self.advance();
        self.current == ProvenanceTier::Unavailable
    }

    fn advance(&mut self) {
        if let Some(next) = self.current.next() {
            self.current = next;
        }
    }

    pub fn attempts(&self) -> &[TierAttempt] {
        &self.attempts
    }

    /// Tiers tried so far, in order
    pub fn tried(&self) -> Vec<ProvenanceTier> {
        self.attempts.iter().map(|a| a.tier).collect()
    }

    pub fn into_attempts(self) -> Vec<TierAttempt> {
        self.attempts
    }
}

/// Final result of one source kind's cascade
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CascadeResult {
    pub kind: SourceKind,
    pub slot: SourceSlot,
    pub attempts: Vec<TierAttempt>,
}

impl CascadeResult {
    pub fn final_tier(&self) -> ProvenanceTier {
        self.slot.tier()
    }

    /// Tiers that were attempted, in order
    pub fn tried(&self) -> Vec<ProvenanceTier> {
        self.attempts.iter().map(|a| a.tier).collect()
    }

    /// True when the recorded tiers never step backwards or skip
    pub fn is_monotone(&self) -> bool {
        let tiers = self.tried();
        tiers.first().map_or(true, |t| *t == ProvenanceTier::Primary)
            && tiers.windows(2).all(|w| w[0].next() == Some(w[1]))
    }
}
