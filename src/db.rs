// Customer Store - Storage collaborator for identity resolution
//
// The resolver never talks to SQLite directly; it sees the CustomerStore
// trait. Production uses SqliteCustomerStore over a connection (or an open
// transaction, so a whole import commits or rolls back as one unit); tests
// use an in-memory fixture implementation.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// CUSTOMER
// ============================================================================

/// Canonical customer entity as seen by the matcher.
///
/// The id is assigned by storage at creation and never reused; the name keeps
/// the original trimmed casing of the first import that created it. This core
/// never mutates or deletes a customer once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: i64,
    pub name: String,
}

// ============================================================================
// STORE ERRORS
// ============================================================================

/// A read or create against the customer store failed. Propagates unchanged
/// to the batch caller and aborts the in-flight import.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("customer store unavailable: {0}")]
    Unavailable(#[from] rusqlite::Error),
}

// ============================================================================
// STORE TRAIT
// ============================================================================

/// Storage operations the resolver depends on.
///
/// `list_customers` returns the full snapshot, id-ascending, no pagination.
/// `find_by_exact_name` is case-insensitive equality. `create_customer`
/// assigns and returns a new unique id.
pub trait CustomerStore {
    fn list_customers(&self) -> Result<Vec<Customer>, StoreError>;

    fn find_by_exact_name(&self, name: &str) -> Result<Option<i64>, StoreError>;

    fn create_customer(&mut self, name: &str, notes: Option<&str>) -> Result<i64, StoreError>;
}

// ============================================================================
// SQLITE IMPLEMENTATION
// ============================================================================

/// Customer store backed by a SQLite connection.
///
/// Borrows the connection, so it can wrap a `rusqlite::Transaction` (which
/// derefs to `Connection`) and participate in the import's atomic commit.
pub struct SqliteCustomerStore<'c> {
    conn: &'c Connection,
}

impl<'c> SqliteCustomerStore<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        SqliteCustomerStore { conn }
    }
}

impl CustomerStore for SqliteCustomerStore<'_> {
    fn list_customers(&self) -> Result<Vec<Customer>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name FROM customers ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok(Customer {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?;

        let mut customers = Vec::new();
        for row in rows {
            customers.push(row?);
        }
        Ok(customers)
    }

    fn find_by_exact_name(&self, name: &str) -> Result<Option<i64>, StoreError> {
        let id = self
            .conn
            .query_row(
                "SELECT id FROM customers WHERE LOWER(name) = LOWER(?1)",
                params![name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    fn create_customer(&mut self, name: &str, notes: Option<&str>) -> Result<i64, StoreError> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO customers (name, notes, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?3)",
            params![name, notes, now],
        )?;
        Ok(self.conn.last_insert_rowid())
    }
}

// ============================================================================
// SCHEMA SETUP
// ============================================================================

pub fn setup_database(conn: &Connection) -> Result<(), rusqlite::Error> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    // ==========================================================================
    // Customers Table (canonical entities produced by identity resolution)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS customers (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            notes TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;

    // ==========================================================================
    // Servers Table
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS servers (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            customer TEXT NOT NULL,
            customer_id INTEGER NOT NULL REFERENCES customers(id),
            vm_name TEXT,
            host TEXT,
            ip_addresses TEXT,
            cores INTEGER NOT NULL DEFAULT 0,
            memory_capacity TEXT,
            storage_used_gib REAL NOT NULL DEFAULT 0,
            storage_provisioned_gib REAL NOT NULL DEFAULT 0,
            assigned_engineer TEXT,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    // ==========================================================================
    // Voice Systems Table
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS voice_systems (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            customer TEXT NOT NULL,
            customer_id INTEGER NOT NULL REFERENCES customers(id),
            vm_name TEXT,
            system_type TEXT,
            extension_count INTEGER NOT NULL DEFAULT 0,
            assigned_engineer TEXT,
            notes TEXT,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    // ==========================================================================
    // Colo Customers Table
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS colo_customers (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            customer_name TEXT NOT NULL,
            customer_id INTEGER NOT NULL REFERENCES customers(id),
            rack_location TEXT,
            new_cabinet_number TEXT,
            equipment_count INTEGER NOT NULL DEFAULT 0,
            power_usage REAL NOT NULL DEFAULT 0,
            assigned_engineer TEXT,
            notes TEXT,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    // ==========================================================================
    // Indexes
    // ==========================================================================
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_customers_name ON customers(name)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_servers_customer_id ON servers(customer_id)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_voice_systems_customer_id ON voice_systems(customer_id)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_colo_customers_customer_id ON colo_customers(customer_id)",
        [],
    )?;

    Ok(())
}

/// Count rows in the customers table.
pub fn count_customers(conn: &Connection) -> Result<i64, rusqlite::Error> {
    conn.query_row("SELECT COUNT(*) FROM customers", [], |row| row.get(0))
}

// ============================================================================
// TESTS
// ============================================================================
