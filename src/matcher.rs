// Name Matcher - Exact and fuzzy matching against the customer snapshot
//
// Two-pass design:
// 1. Exact pass: case-insensitive equality, returns immediately on a hit so
//    fuzzy scoring never runs for names we already know.
// 2. Fuzzy pass: score the candidate against every stored name, keep the best
//    (lowest) distance, then gate it through two thresholds. Candidates above
//    the search threshold are out of consideration entirely; acceptance
//    requires a score strictly below the (tighter) accept threshold.
//
// Ties on the best score break toward the lowest customer id, so the outcome
// does not depend on snapshot ordering.

use tracing::debug;

use crate::config::ResolverConfig;
use crate::db::Customer;
use crate::similarity::{NameSimilarity, NormalizedLevenshtein};

// ============================================================================
// MATCH OUTCOME
// ============================================================================

/// Result of matching one candidate name against the customer snapshot.
/// Absence of a match is a normal outcome, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    /// Case-insensitive equality with an existing customer name.
    Exact(i64),

    /// Best fuzzy score fell strictly below the accept threshold.
    Fuzzy { id: i64, score: f64 },

    /// No existing customer is close enough; caller should create one.
    NoMatch,
}

impl MatchOutcome {
    /// The matched customer id, if any.
    pub fn id(&self) -> Option<i64> {
        match self {
            MatchOutcome::Exact(id) => Some(*id),
            MatchOutcome::Fuzzy { id, .. } => Some(*id),
            MatchOutcome::NoMatch => None,
        }
    }
}

// ============================================================================
// NAME MATCHER
// ============================================================================

pub struct NameMatcher {
    similarity: Box<dyn NameSimilarity + Send + Sync>,

    /// Fuzzy candidates scoring above this are never considered.
    search_threshold: f64,

    /// A best score must be strictly below this to be accepted.
    accept_threshold: f64,
}

impl NameMatcher {
    /// Matcher with default thresholds and normalized Levenshtein distance.
    pub fn new() -> Self {
        Self::from_config(&ResolverConfig::default())
    }

    pub fn from_config(config: &ResolverConfig) -> Self {
        NameMatcher {
            similarity: Box::new(NormalizedLevenshtein),
            search_threshold: config.search_threshold,
            accept_threshold: config.accept_threshold,
        }
    }

    /// Swap in a different distance function (thresholds unchanged).
    pub fn with_similarity(
        mut self,
        similarity: impl NameSimilarity + Send + Sync + 'static,
    ) -> Self {
        self.similarity = Box::new(similarity);
        self
    }

    /// Match a cleaned, non-empty candidate against the snapshot.
    pub fn find_match(&self, candidate: &str, customers: &[Customer]) -> MatchOutcome {
        let candidate_lower = candidate.to_lowercase();

        // Exact pass: first case-insensitive hit wins, no scoring
        for customer in customers {
            if customer.name.to_lowercase() == candidate_lower {
                return MatchOutcome::Exact(customer.id);
            }
        }

        // Nothing to compare against
        if customers.is_empty() {
            return MatchOutcome::NoMatch;
        }

        // Fuzzy pass: best (lowest) score wins, ties break to the lowest id
        let mut best: Option<(f64, i64)> = None;

        for customer in customers {
            let score = self
                .similarity
                .distance(&candidate_lower, &customer.name.to_lowercase());

            if score > self.search_threshold {
                continue;
            }

            let better = match best {
                None => true,
                Some((best_score, best_id)) => {
                    score < best_score || (score == best_score && customer.id < best_id)
                }
            };
            if better {
                best = Some((score, customer.id));
            }
        }

        match best {
            Some((score, id)) if score < self.accept_threshold => {
                debug!(candidate, customer_id = id, score, "fuzzy match accepted");
                MatchOutcome::Fuzzy { id, score }
            }
            Some((score, id)) => {
                // Near-tie at the boundary: bias toward creating a new
                // customer over risking an incorrect merge.
                debug!(candidate, customer_id = id, score, "best score rejected");
                MatchOutcome::NoMatch
            }
            None => MatchOutcome::NoMatch,
        }
    }
}

impl Default for NameMatcher {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================
