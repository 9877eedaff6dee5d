// String Similarity - Pluggable distance functions for fuzzy name matching
//
// The matcher only ever sees a distance in [0.0, 1.0] (0.0 = identical,
// 1.0 = unrelated), so the underlying algorithm can be swapped without
// touching threshold logic.

/// A string-distance function usable by the name matcher.
///
/// Implementations must be symmetric and return 0.0 for identical inputs.
/// Inputs arrive already lowercased; implementations do not case-fold.
pub trait NameSimilarity {
    /// Distance between two strings: 0.0 = identical, 1.0 = unrelated.
    fn distance(&self, a: &str, b: &str) -> f64;
}

/// Normalized Levenshtein distance (edit distance / longer length).
///
/// Default metric: a one-character typo in a 16-character name scores
/// 1/16 = 0.0625, well inside the accept threshold.
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizedLevenshtein;

impl NameSimilarity for NormalizedLevenshtein {
    fn distance(&self, a: &str, b: &str) -> f64 {
        1.0 - strsim::normalized_levenshtein(a, b)
    }
}

/// Jaro-Winkler distance. Weighs shared prefixes more heavily, which suits
/// company names that diverge in their suffix ("Acme Corp" vs "Acme Corp.").
#[derive(Debug, Clone, Copy, Default)]
pub struct JaroWinkler;

impl NameSimilarity for JaroWinkler {
    fn distance(&self, a: &str, b: &str) -> f64 {
        1.0 - strsim::jaro_winkler(a, b)
    }
}
