// Entity Import Adapters - CSV rows to typed records with resolved customers
//
// Each entity that carries a customer column (servers, voice systems, colo
// customers) follows the same shape:
// - a header-alias table mapping the accepted CSV spellings to one field
// - a typed record produced before anything touches the resolver
// - an import that parses the whole file, resolves customer names in one
//   batch, and inserts rows inside a single transaction (a failed import
//   leaves zero customers and zero rows behind)
// - an export writing the canonical header names back out

pub mod colo_customer;
pub mod server;
pub mod voice_system;

pub use colo_customer::{export_colo_customers, import_colo_customers, ColoCustomerRecord};
pub use server::{export_servers, import_servers, ServerRecord};
pub use voice_system::{export_voice_systems, import_voice_systems, VoiceSystemRecord};

use std::collections::HashMap;
use std::io;

use thiserror::Error;

use crate::db::StoreError;
use crate::resolver::ResolutionStats;

// ============================================================================
// IMPORT ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

// ============================================================================
// IMPORT SUMMARY
// ============================================================================

/// What one CSV import did: rows landed plus customer-resolution decisions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// Rows inserted into the entity table.
    pub rows: usize,

    /// Customer-resolution tally for the batch.
    pub resolution: ResolutionStats,
}

// ============================================================================
// HEADER-ALIAS MAPPING
// ============================================================================

/// Maps a CSV header row to column indexes once, so record extraction is a
/// table lookup instead of per-row string probing.
///
/// Aliases are tried in declared order; the first header present in the file
/// wins for that field.
pub struct RowMapper {
    index: HashMap<String, usize>,
}

impl RowMapper {
    pub fn new(headers: &csv::StringRecord) -> Self {
        let index = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.trim().to_string(), i))
            .collect();
        RowMapper { index }
    }

    /// First non-empty value among the aliased columns, untrimmed.
    pub fn get<'r>(&self, record: &'r csv::StringRecord, aliases: &[&str]) -> Option<&'r str> {
        for alias in aliases {
            if let Some(&col) = self.index.get(*alias) {
                if let Some(value) = record.get(col) {
                    if !value.trim().is_empty() {
                        return Some(value);
                    }
                }
            }
        }
        None
    }

    /// Whether the file carries any of the aliased columns at all.
    pub fn has_any(&self, aliases: &[&str]) -> bool {
        aliases.iter().any(|alias| self.index.contains_key(*alias))
    }
}

/// Lenient integer parse: anything unparsable becomes 0, matching how the
/// tracker has always treated count columns.
pub(crate) fn parse_int(value: Option<&str>) -> i64 {
    value
        .map(str::trim)
        .and_then(|v| v.parse().ok())
        .unwrap_or(0)
}

/// Lenient float parse, same policy as `parse_int`.
pub(crate) fn parse_float(value: Option<&str>) -> f64 {
    value
        .map(str::trim)
        .and_then(|v| v.parse().ok())
        .unwrap_or(0.0)
}

// ============================================================================
// TESTS
// ============================================================================
