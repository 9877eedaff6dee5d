// Migration Tracker - Core Library
// Customer identity resolution for data-center migration imports.
//
// Free-text customer names arrive on every imported inventory CSV (servers,
// voice systems, colo customers). This library reconciles them into canonical
// customer rows: exact match first, fuzzy match for near-identical spellings,
// create otherwise, with blank names absorbed by a single "Unknown" sentinel.
// The HTTP route layer consumes it as a plain in-process dependency.

pub mod config;
pub mod db;
pub mod entities;
pub mod matcher;
pub mod normalize;
pub mod resolver;
pub mod similarity;

// Re-export commonly used types
pub use config::{ConfigError, ResolverConfig};
pub use db::{
    count_customers, setup_database, Customer, CustomerStore, SqliteCustomerStore, StoreError,
};
pub use entities::{
    export_colo_customers, export_servers, export_voice_systems, import_colo_customers,
    import_servers, import_voice_systems, ColoCustomerRecord, ImportError, ImportSummary,
    RowMapper, ServerRecord, VoiceSystemRecord,
};
pub use matcher::{MatchOutcome, NameMatcher};
pub use normalize::{clean_name, is_blank};
pub use resolver::{CustomerResolver, ResolutionStats};
pub use similarity::{JaroWinkler, NameSimilarity, NormalizedLevenshtein};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
