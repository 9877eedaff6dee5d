// Customer Resolver - Batch find-or-create over the customer store
//
// One resolver call per CSV import. The snapshot of existing customers is
// loaded once per batch and every create is appended to it immediately, so a
// customer created for an early row is visible to every later distinct name
// in the same batch. Each distinct raw string (including "") is resolved
// exactly once; the returned memo maps every raw string to its customer id so
// the caller can stamp customer_id onto rows by plain lookup.
//
// Blank names never reach the matcher: they all route to the "Unknown"
// sentinel customer, which is looked up by exact name only and created at
// most once.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info};

use crate::config::ResolverConfig;
use crate::db::{Customer, CustomerStore, StoreError};
use crate::matcher::{MatchOutcome, NameMatcher};
use crate::normalize::clean_name;

/// Notes text attached to the sentinel customer on creation.
const UNKNOWN_CUSTOMER_NOTES: &str = "Default customer for unassigned items";

// ============================================================================
// RESOLUTION STATS
// ============================================================================

/// Running tally of resolution decisions, for import summaries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolutionStats {
    /// Names that hit an existing customer by case-insensitive equality.
    pub matched_exact: usize,

    /// Names that reused an existing customer via an accepted fuzzy score.
    pub matched_fuzzy: usize,

    /// Names that created a brand-new customer.
    pub created: usize,

    /// Blank names routed to the Unknown sentinel.
    pub blank: usize,
}

// ============================================================================
// CUSTOMER RESOLVER
// ============================================================================

/// Turns raw candidate names into durable customer ids.
///
/// The store is an injected dependency; the resolver holds no global state.
/// Single-threaded by design: resolution within a batch is sequential, and
/// two concurrent imports racing on the same new name can still produce
/// duplicates (the store's own write serialization governs that case).
pub struct CustomerResolver<S: CustomerStore> {
    store: S,
    matcher: NameMatcher,
    unknown_name: String,
    unknown_id: Option<i64>,
    stats: ResolutionStats,
}

impl<S: CustomerStore> CustomerResolver<S> {
    /// Resolver with default thresholds.
    pub fn new(store: S) -> Self {
        Self::with_config(store, &ResolverConfig::default())
    }

    pub fn with_config(store: S, config: &ResolverConfig) -> Self {
        CustomerResolver {
            store,
            matcher: NameMatcher::from_config(config),
            unknown_name: config.unknown_name.clone(),
            unknown_id: None,
            stats: ResolutionStats::default(),
        }
    }

    /// Replace the matcher (e.g. to swap the similarity function).
    pub fn with_matcher(mut self, matcher: NameMatcher) -> Self {
        self.matcher = matcher;
        self
    }

    /// Decisions made so far, across all batches this resolver has run.
    pub fn stats(&self) -> ResolutionStats {
        self.stats
    }

    /// Give the store back (used by callers that own the connection).
    pub fn into_store(self) -> S {
        self.store
    }

    /// Look up the "Unknown" sentinel customer, creating it on first need.
    ///
    /// Exact-name lookup only; fuzzy matching never applies to the sentinel.
    /// Idempotent, and safe to call before batch processing.
    pub fn ensure_unknown_customer(&mut self) -> Result<i64, StoreError> {
        if let Some(id) = self.unknown_id {
            return Ok(id);
        }

        let id = match self.store.find_by_exact_name(&self.unknown_name)? {
            Some(id) => id,
            None => {
                let id = self
                    .store
                    .create_customer(&self.unknown_name, Some(UNKNOWN_CUSTOMER_NOTES))?;
                info!(customer_id = id, "created sentinel customer for unassigned items");
                id
            }
        };

        self.unknown_id = Some(id);
        Ok(id)
    }

    /// Resolve a batch of raw customer names to ids.
    ///
    /// Returns a memo from every distinct raw string (including "") to the
    /// customer id it resolved to. Any store error aborts the batch; the
    /// import adapters run the whole import inside one transaction, so an
    /// aborted batch leaves no customers behind.
    pub fn process_batch<I, T>(&mut self, raw_names: I) -> Result<HashMap<String, i64>, StoreError>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        // Distinct raw strings in first-seen order
        let mut seen = HashSet::new();
        let mut distinct: Vec<String> = Vec::new();
        for raw in raw_names {
            let raw = raw.as_ref();
            if seen.insert(raw.to_string()) {
                distinct.push(raw.to_string());
            }
        }

        // One snapshot per batch; creates are appended below so later names
        // can match customers created earlier in this same batch.
        let mut snapshot = self.store.list_customers()?;

        let mut memo = HashMap::with_capacity(distinct.len());
        for raw in distinct {
            let id = self.resolve_one(&mut snapshot, &raw)?;
            memo.insert(raw, id);
        }

        Ok(memo)
    }

    /// Resolve a single raw name against the batch snapshot.
    ///
    /// Private on purpose: import flows must go through `process_batch` so
    /// memoization and snapshot consistency hold.
    fn resolve_one(
        &mut self,
        snapshot: &mut Vec<Customer>,
        raw: &str,
    ) -> Result<i64, StoreError> {
        let cleaned = clean_name(raw);

        if cleaned.is_empty() {
            self.stats.blank += 1;
            let id = self.ensure_unknown_customer()?;
            // The sentinel may have been created after the snapshot was
            // taken; add it so a literal "Unknown" later in the batch
            // exact-matches instead of creating a duplicate.
            if !snapshot.iter().any(|c| c.id == id) {
                snapshot.push(Customer {
                    id,
                    name: self.unknown_name.clone(),
                });
            }
            return Ok(id);
        }

        match self.matcher.find_match(cleaned, snapshot) {
            MatchOutcome::Exact(id) => {
                debug!(name = cleaned, customer_id = id, "exact customer match");
                self.stats.matched_exact += 1;
                Ok(id)
            }
            MatchOutcome::Fuzzy { id, score } => {
                info!(name = cleaned, customer_id = id, score, "fuzzy customer match");
                self.stats.matched_fuzzy += 1;
                Ok(id)
            }
            MatchOutcome::NoMatch => {
                let id = self.store.create_customer(cleaned, None)?;
                info!(name = cleaned, customer_id = id, "created new customer");
                snapshot.push(Customer {
                    id,
                    name: cleaned.to_string(),
                });
                self.stats.created += 1;
                Ok(id)
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// In-memory store fixture; mirrors the SQLite store's contract.
    #[derive(Default)]
    struct MemoryStore {
        customers: Vec<Customer>,
        next_id: i64,
        /// When set, every call fails (storage-outage fixture).
        fail: bool,
    }

    impl MemoryStore {
        fn new() -> Self {
            MemoryStore {
                customers: Vec::new(),
                next_id: 1,
                fail: false,
            }
        }

        fn with_customers(names: &[&str]) -> Self {
            let mut store = Self::new();
            for name in names {
                let id = store.next_id;
                store.next_id += 1;
                store.customers.push(Customer {
                    id,
                    name: name.to_string(),
                });
            }
            store
        }

        fn outage() -> StoreError {
            StoreError::Unavailable(rusqlite::Error::InvalidQuery)
        }
    }

    impl CustomerStore for MemoryStore {
        fn list_customers(&self) -> Result<Vec<Customer>, StoreError> {
            if self.fail {
                return Err(Self::outage());
            }
            Ok(self.customers.clone())
        }

        fn find_by_exact_name(&self, name: &str) -> Result<Option<i64>, StoreError> {
            if self.fail {
                return Err(Self::outage());
            }
            Ok(self
                .customers
                .iter()
                .find(|c| c.name.to_lowercase() == name.to_lowercase())
                .map(|c| c.id))
        }

        fn create_customer(&mut self, name: &str, _notes: Option<&str>) -> Result<i64, StoreError> {
            if self.fail {
                return Err(Self::outage());
            }
            let id = self.next_id;
            self.next_id += 1;
            self.customers.push(Customer {
                id,
                name: name.to_string(),
            });
            Ok(id)
        }
    }

    #[test]
    fn test_duplicate_raw_names_resolve_once() {
        let mut resolver = CustomerResolver::new(MemoryStore::new());
        let memo = resolver
            .process_batch(["Acme Corp", "Acme Corp", "Beta LLC"])
            .unwrap();

        assert_eq!(memo.len(), 2);
        assert_ne!(memo["Acme Corp"], memo["Beta LLC"]);
        assert_eq!(resolver.stats().created, 2);
        assert_eq!(resolver.into_store().customers.len(), 2);
    }

    #[test]
    fn test_repeat_batch_is_idempotent() {
        let mut resolver = CustomerResolver::new(MemoryStore::new());
        let first = resolver.process_batch(["Acme Corp", "Beta LLC"]).unwrap();

        let store = resolver.into_store();
        let mut resolver = CustomerResolver::new(store);
        let second = resolver.process_batch(["Acme Corp", "Beta LLC"]).unwrap();

        assert_eq!(first, second);
        assert_eq!(resolver.stats().created, 0);
        assert_eq!(resolver.stats().matched_exact, 2);
        assert_eq!(resolver.into_store().customers.len(), 2);
    }

    #[test]
    fn test_exact_match_across_batches_is_case_insensitive() {
        let mut resolver = CustomerResolver::new(MemoryStore::new());
        let first = resolver.process_batch(["Acme Corp"]).unwrap();

        let mut resolver = CustomerResolver::new(resolver.into_store());
        let second = resolver.process_batch(["acme corp"]).unwrap();

        assert_eq!(first["Acme Corp"], second["acme corp"]);
    }

    #[test]
    fn test_blank_names_all_route_to_one_unknown() {
        let mut resolver = CustomerResolver::new(MemoryStore::new());
        let memo = resolver.process_batch(["", "   ", "\t"]).unwrap();

        let unknown_id = memo[""];
        assert_eq!(memo["   "], unknown_id);
        assert_eq!(memo["\t"], unknown_id);
        assert_eq!(resolver.stats().blank, 3);

        let store = resolver.into_store();
        let unknowns: Vec<_> = store
            .customers
            .iter()
            .filter(|c| c.name == "Unknown")
            .collect();
        assert_eq!(unknowns.len(), 1);
        assert_eq!(store.customers.len(), 1);
    }

    #[test]
    fn test_ensure_unknown_customer_is_idempotent() {
        let mut resolver = CustomerResolver::new(MemoryStore::new());
        let first = resolver.ensure_unknown_customer().unwrap();
        let second = resolver.ensure_unknown_customer().unwrap();

        assert_eq!(first, second);
        assert_eq!(resolver.into_store().customers.len(), 1);
    }

    #[test]
    fn test_ensure_unknown_reuses_existing_row() {
        let store = MemoryStore::with_customers(&["Unknown"]);
        let mut resolver = CustomerResolver::new(store);

        assert_eq!(resolver.ensure_unknown_customer().unwrap(), 1);
        assert_eq!(resolver.into_store().customers.len(), 1);
    }

    #[test]
    fn test_literal_unknown_after_blank_does_not_duplicate_sentinel() {
        let mut resolver = CustomerResolver::new(MemoryStore::new());
        let memo = resolver.process_batch(["", "Unknown"]).unwrap();

        assert_eq!(memo[""], memo["Unknown"]);
        assert_eq!(resolver.into_store().customers.len(), 1);
    }

    #[test]
    fn test_typo_reuses_existing_customer() {
        let store = MemoryStore::with_customers(&["Acme Corporation"]);
        let mut resolver = CustomerResolver::new(store);

        let memo = resolver.process_batch(["Acme Corporaton"]).unwrap();
        assert_eq!(memo["Acme Corporaton"], 1);
        assert_eq!(resolver.stats().matched_fuzzy, 1);
        assert_eq!(resolver.into_store().customers.len(), 1);
    }

    #[test]
    fn test_distant_name_creates_new_customer() {
        let store = MemoryStore::with_customers(&["Acme Corporation"]);
        let mut resolver = CustomerResolver::new(store);

        let memo = resolver.process_batch(["Totally Different Co"]).unwrap();
        assert_eq!(memo["Totally Different Co"], 2);
        assert_eq!(resolver.into_store().customers.len(), 2);
    }

    #[test]
    fn test_fresh_create_is_visible_within_batch() {
        // Empty store; "Acme Corp." is one edit from "Acme Corp" and must
        // reuse the row created moments earlier in the same batch.
        let mut resolver = CustomerResolver::new(MemoryStore::new());
        let memo = resolver.process_batch(["Acme Corp", "Acme Corp."]).unwrap();

        assert_eq!(memo["Acme Corp"], memo["Acme Corp."]);
        assert_eq!(resolver.stats().created, 1);
        assert_eq!(resolver.stats().matched_fuzzy, 1);
        assert_eq!(resolver.into_store().customers.len(), 1);
    }

    #[test]
    fn test_genuinely_distinct_names_create_two_customers() {
        // "Acme Corp Inc" scores past the search threshold against
        // "Acme Corp", so both rows are legitimate.
        let mut resolver = CustomerResolver::new(MemoryStore::new());
        let memo = resolver
            .process_batch(["Acme Corp", "Acme Corp Inc"])
            .unwrap();

        assert_ne!(memo["Acme Corp"], memo["Acme Corp Inc"]);
        assert_eq!(resolver.into_store().customers.len(), 2);
    }

    #[test]
    fn test_untrimmed_variants_memoize_separately_but_share_id() {
        let mut resolver = CustomerResolver::new(MemoryStore::new());
        let memo = resolver
            .process_batch(["Acme Corp", "  Acme Corp  "])
            .unwrap();

        // Two distinct raw strings in the memo, one customer in storage
        assert_eq!(memo.len(), 2);
        assert_eq!(memo["Acme Corp"], memo["  Acme Corp  "]);
        assert_eq!(resolver.into_store().customers.len(), 1);
    }

    #[test]
    fn test_store_failure_aborts_batch() {
        let mut store = MemoryStore::new();
        store.fail = true;

        let mut resolver = CustomerResolver::new(store);
        assert!(resolver.process_batch(["Acme Corp"]).is_err());
        assert_eq!(resolver.stats(), ResolutionStats::default());
    }

    #[test]
    fn test_custom_unknown_name_from_config() {
        let config = ResolverConfig {
            unknown_name: "Unassigned".to_string(),
            ..ResolverConfig::default()
        };
        let mut resolver = CustomerResolver::with_config(MemoryStore::new(), &config);

        resolver.process_batch([""]).unwrap();
        let store = resolver.into_store();
        assert_eq!(store.customers[0].name, "Unassigned");
    }
}
