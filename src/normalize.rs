// Name Normalizer - Canonical comparison form for imported customer names
//
// Customers are stored with their original (trimmed) casing; all comparison
// happens case-insensitively downstream. A name that is empty after trimming
// is the signal to route the row to the "Unknown" sentinel customer.

/// Trim an imported customer name down to its canonical form.
///
/// Returns the empty string for missing or all-whitespace input.
pub fn clean_name(raw: &str) -> &str {
    raw.trim()
}

/// True when a raw name carries no usable customer information.
pub fn is_blank(raw: &str) -> bool {
    clean_name(raw).is_empty()
}
