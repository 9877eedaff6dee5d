// Server Entity - VM inventory rows imported from the virtualization export
//
// The customer column feeds identity resolution; every row leaves the import
// with a customer_id foreign key, falling back to the Unknown sentinel when
// the column is blank.

use std::io;
use std::path::Path;

use chrono::Utc;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::ResolverConfig;
use crate::db::SqliteCustomerStore;
use crate::entities::{parse_float, parse_int, ImportError, ImportSummary, RowMapper};
use crate::resolver::CustomerResolver;

// Accepted CSV header spellings per field
const CUSTOMER: &[&str] = &["Customer", "customer"];
const VM_NAME: &[&str] = &["VM Name", "vm_name"];
const HOST: &[&str] = &["Host", "host"];
const IP_ADDRESSES: &[&str] = &["IP Addresses", "ip_addresses"];
const CORES: &[&str] = &["Cores", "cores"];
const MEMORY_CAPACITY: &[&str] = &["Memory Capacity", "memory_capacity"];
const STORAGE_USED: &[&str] = &["Storage Used (GiB)", "storage_used_gib"];
const STORAGE_PROVISIONED: &[&str] = &["Storage Provisioned (GiB)", "storage_provisioned_gib"];
const ASSIGNED_ENGINEER: &[&str] = &["Assigned Engineer", "assigned_engineer"];

/// One server row, typed before it reaches the resolver.
///
/// `customer` keeps the raw imported string (the resolution memo is keyed by
/// it); the resolved id is attached at insert time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerRecord {
    pub customer: String,
    pub vm_name: Option<String>,
    pub host: Option<String>,
    pub ip_addresses: Option<String>,
    pub cores: i64,
    pub memory_capacity: Option<String>,
    pub storage_used_gib: f64,
    pub storage_provisioned_gib: f64,
    pub assigned_engineer: Option<String>,
}

fn read_csv<R: io::Read>(reader: R) -> Result<Vec<ServerRecord>, ImportError> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mapper = RowMapper::new(rdr.headers()?);

    if !mapper.has_any(CUSTOMER) {
        warn!("servers CSV has no recognizable customer column; all rows will resolve to the sentinel customer");
    }

    let mut records = Vec::new();
    for result in rdr.records() {
        let row = result?;
        records.push(ServerRecord {
            customer: mapper.get(&row, CUSTOMER).unwrap_or("").to_string(),
            vm_name: mapper.get(&row, VM_NAME).map(str::to_string),
            host: mapper.get(&row, HOST).map(str::to_string),
            ip_addresses: mapper.get(&row, IP_ADDRESSES).map(str::to_string),
            cores: parse_int(mapper.get(&row, CORES)),
            memory_capacity: mapper.get(&row, MEMORY_CAPACITY).map(str::to_string),
            storage_used_gib: parse_float(mapper.get(&row, STORAGE_USED)),
            storage_provisioned_gib: parse_float(mapper.get(&row, STORAGE_PROVISIONED)),
            assigned_engineer: mapper.get(&row, ASSIGNED_ENGINEER).map(str::to_string),
        });
    }
    Ok(records)
}

/// Import a servers CSV: resolve customer names in one batch, insert every
/// row with its customer_id, all inside a single transaction.
pub fn import_servers<R: io::Read>(
    conn: &mut Connection,
    reader: R,
    config: &ResolverConfig,
) -> Result<ImportSummary, ImportError> {
    // Parse the whole file before any write so a malformed CSV imports nothing
    let records = read_csv(reader)?;

    let tx = conn.transaction()?;
    let summary = {
        let mut resolver =
            CustomerResolver::with_config(SqliteCustomerStore::new(&tx), config);
        resolver.ensure_unknown_customer()?;
        let memo = resolver.process_batch(records.iter().map(|r| r.customer.as_str()))?;

        let now = Utc::now().to_rfc3339();
        for record in &records {
            tx.execute(
                "INSERT INTO servers (
                    customer, customer_id, vm_name, host, ip_addresses, cores,
                    memory_capacity, storage_used_gib, storage_provisioned_gib,
                    assigned_engineer, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    record.customer,
                    memo[&record.customer],
                    record.vm_name,
                    record.host,
                    record.ip_addresses,
                    record.cores,
                    record.memory_capacity,
                    record.storage_used_gib,
                    record.storage_provisioned_gib,
                    record.assigned_engineer,
                    now,
                ],
            )?;
        }

        ImportSummary {
            rows: records.len(),
            resolution: resolver.stats(),
        }
    };
    tx.commit()?;

    Ok(summary)
}

/// Import a servers CSV from a file on disk.
pub fn import_servers_from_path(
    conn: &mut Connection,
    path: &Path,
    config: &ResolverConfig,
) -> Result<ImportSummary, ImportError> {
    let file = std::fs::File::open(path)?;
    import_servers(conn, file, config)
}

/// Export all servers with the canonical header names.
pub fn export_servers<W: io::Write>(conn: &Connection, writer: W) -> Result<usize, ImportError> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record([
        "Customer",
        "VM Name",
        "Host",
        "IP Addresses",
        "Cores",
        "Memory Capacity",
        "Storage Used (GiB)",
        "Storage Provisioned (GiB)",
        "Assigned Engineer",
    ])?;

    let mut stmt = conn.prepare(
        "SELECT customer, vm_name, host, ip_addresses, cores, memory_capacity,
                storage_used_gib, storage_provisioned_gib, assigned_engineer
         FROM servers ORDER BY id",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(ServerRecord {
            customer: row.get(0)?,
            vm_name: row.get(1)?,
            host: row.get(2)?,
            ip_addresses: row.get(3)?,
            cores: row.get(4)?,
            memory_capacity: row.get(5)?,
            storage_used_gib: row.get(6)?,
            storage_provisioned_gib: row.get(7)?,
            assigned_engineer: row.get(8)?,
        })
    })?;

    let mut count = 0;
    for row in rows {
        let record = row?;
        let cores = record.cores.to_string();
        let used = record.storage_used_gib.to_string();
        let provisioned = record.storage_provisioned_gib.to_string();
        wtr.write_record([
            record.customer.as_str(),
            record.vm_name.as_deref().unwrap_or(""),
            record.host.as_deref().unwrap_or(""),
            record.ip_addresses.as_deref().unwrap_or(""),
            cores.as_str(),
            record.memory_capacity.as_deref().unwrap_or(""),
            used.as_str(),
            provisioned.as_str(),
            record.assigned_engineer.as_deref().unwrap_or(""),
        ])?;
        count += 1;
    }
    wtr.flush()?;

    Ok(count)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{count_customers, setup_database};
    use std::io::Write;

    fn open_test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        conn
    }

    fn count_servers(conn: &Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM servers", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_round_trip_import_shares_customer_ids() {
        let mut conn = open_test_db();
        let csv = "\
Customer,VM Name,Cores
Acme Corp,web-01,4
Acme Corp,web-02,8
Beta LLC,db-01,16
";
        let summary =
            import_servers(&mut conn, csv.as_bytes(), &ResolverConfig::default()).unwrap();
        assert_eq!(summary.rows, 3);
        assert_eq!(summary.resolution.created, 2);

        // 2 named customers + the Unknown sentinel
        assert_eq!(count_customers(&conn).unwrap(), 3);

        let ids: Vec<i64> = {
            let mut stmt = conn
                .prepare("SELECT customer_id FROM servers ORDER BY id")
                .unwrap();
            stmt.query_map([], |row| row.get(0))
                .unwrap()
                .map(Result::unwrap)
                .collect()
        };
        assert_eq!(ids[0], ids[1]);
        assert_ne!(ids[0], ids[2]);
    }

    #[test]
    fn test_blank_customer_rows_link_to_unknown() {
        let mut conn = open_test_db();
        let csv = "\
Customer,VM Name
,orphan-01
Acme Corp,web-01
";
        import_servers(&mut conn, csv.as_bytes(), &ResolverConfig::default()).unwrap();

        let unknown_id: i64 = conn
            .query_row(
                "SELECT id FROM customers WHERE name = 'Unknown'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        let orphan_customer: i64 = conn
            .query_row(
                "SELECT customer_id FROM servers WHERE vm_name = 'orphan-01'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(orphan_customer, unknown_id);
    }

    #[test]
    fn test_typo_in_second_import_reuses_customer() {
        let mut conn = open_test_db();
        let first = "Customer,VM Name\nAcme Corporation,web-01\n";
        import_servers(&mut conn, first.as_bytes(), &ResolverConfig::default()).unwrap();

        let second = "Customer,VM Name\nAcme Corporaton,web-02\n";
        let summary =
            import_servers(&mut conn, second.as_bytes(), &ResolverConfig::default()).unwrap();

        assert_eq!(summary.resolution.matched_fuzzy, 1);
        assert_eq!(summary.resolution.created, 0);

        let distinct: i64 = conn
            .query_row(
                "SELECT COUNT(DISTINCT customer_id) FROM servers",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(distinct, 1);
    }

    #[test]
    fn test_malformed_csv_imports_nothing() {
        let mut conn = open_test_db();
        // Second row has a ragged field count
        let csv = "Customer,VM Name\nAcme Corp,web-01\nBeta LLC\n";

        let result = import_servers(&mut conn, csv.as_bytes(), &ResolverConfig::default());
        assert!(matches!(result, Err(ImportError::Csv(_))));

        // Atomic failure: no rows, no customers, no sentinel
        assert_eq!(count_servers(&conn), 0);
        assert_eq!(count_customers(&conn).unwrap(), 0);
    }

    #[test]
    fn test_snake_case_headers_are_accepted() {
        let mut conn = open_test_db();
        let csv = "customer,vm_name,cores\nAcme Corp,web-01,4\n";
        let summary =
            import_servers(&mut conn, csv.as_bytes(), &ResolverConfig::default()).unwrap();
        assert_eq!(summary.rows, 1);

        let vm_name: String = conn
            .query_row("SELECT vm_name FROM servers", [], |row| row.get(0))
            .unwrap();
        assert_eq!(vm_name, "web-01");
    }

    #[test]
    fn test_import_from_path() {
        let mut conn = open_test_db();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "Customer,VM Name\nAcme Corp,web-01\n").unwrap();

        let summary =
            import_servers_from_path(&mut conn, file.path(), &ResolverConfig::default()).unwrap();
        assert_eq!(summary.rows, 1);
    }

    #[test]
    fn test_export_round_trips_rows() {
        let mut conn = open_test_db();
        let csv = "\
Customer,VM Name,Cores,Storage Used (GiB)
Acme Corp,web-01,4,120.5
Beta LLC,db-01,16,800
";
        import_servers(&mut conn, csv.as_bytes(), &ResolverConfig::default()).unwrap();

        let mut out = Vec::new();
        let count = export_servers(&conn, &mut out).unwrap();
        assert_eq!(count, 2);

        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert!(lines.next().unwrap().starts_with("Customer,VM Name,Host"));
        assert!(text.contains("Acme Corp,web-01"));
        assert!(text.contains("120.5"));
    }
}
