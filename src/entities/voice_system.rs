// Voice System Entity - PBX/voice platform rows from the voice inventory CSV

use std::io;
use std::path::Path;

use chrono::Utc;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::ResolverConfig;
use crate::db::SqliteCustomerStore;
use crate::entities::{parse_int, ImportError, ImportSummary, RowMapper};
use crate::resolver::CustomerResolver;

const CUSTOMER: &[&str] = &["Customer", "customer"];
const VM_NAME: &[&str] = &["VM Name", "vm_name"];
const SYSTEM_TYPE: &[&str] = &["System Type", "system_type"];
const EXTENSION_COUNT: &[&str] = &["Extension Count", "extension_count"];
const ASSIGNED_ENGINEER: &[&str] = &["Assigned Engineer", "assigned_engineer"];
const NOTES: &[&str] = &["Notes", "notes"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceSystemRecord {
    pub customer: String,
    pub vm_name: Option<String>,
    pub system_type: Option<String>,
    pub extension_count: i64,
    pub assigned_engineer: Option<String>,
    pub notes: Option<String>,
}

fn read_csv<R: io::Read>(reader: R) -> Result<Vec<VoiceSystemRecord>, ImportError> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mapper = RowMapper::new(rdr.headers()?);

    if !mapper.has_any(CUSTOMER) {
        warn!("voice systems CSV has no recognizable customer column; all rows will resolve to the sentinel customer");
    }

    let mut records = Vec::new();
    for result in rdr.records() {
        let row = result?;
        records.push(VoiceSystemRecord {
            customer: mapper.get(&row, CUSTOMER).unwrap_or("").to_string(),
            vm_name: mapper.get(&row, VM_NAME).map(str::to_string),
            system_type: mapper.get(&row, SYSTEM_TYPE).map(str::to_string),
            extension_count: parse_int(mapper.get(&row, EXTENSION_COUNT)),
            assigned_engineer: mapper.get(&row, ASSIGNED_ENGINEER).map(str::to_string),
            notes: mapper.get(&row, NOTES).map(str::to_string),
        });
    }
    Ok(records)
}

/// Import a voice systems CSV inside a single transaction.
pub fn import_voice_systems<R: io::Read>(
    conn: &mut Connection,
    reader: R,
    config: &ResolverConfig,
) -> Result<ImportSummary, ImportError> {
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
                "INSERT INTO voice_systems (
                    customer, customer_id, vm_name, system_type,
                    extension_count, assigned_engineer, notes, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    record.customer,
                    memo[&record.customer],
                    record.vm_name,
                    record.system_type,
                    record.extension_count,
                    record.assigned_engineer,
                    record.notes,
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

/// Import a voice systems CSV from a file on disk.
pub fn import_voice_systems_from_path(
    conn: &mut Connection,
    path: &Path,
    config: &ResolverConfig,
) -> Result<ImportSummary, ImportError> {
    let file = std::fs::File::open(path)?;
    import_voice_systems(conn, file, config)
}

/// Export all voice systems with the canonical header names.
pub fn export_voice_systems<W: io::Write>(
    conn: &Connection,
    writer: W,
) -> Result<usize, ImportError> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record([
        "Customer",
        "VM Name",
        "System Type",
        "Extension Count",
        "Assigned Engineer",
        "Notes",
    ])?;

    let mut stmt = conn.prepare(
        "SELECT customer, vm_name, system_type, extension_count,
                assigned_engineer, notes
         FROM voice_systems ORDER BY id",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(VoiceSystemRecord {
            customer: row.get(0)?,
            vm_name: row.get(1)?,
            system_type: row.get(2)?,
            extension_count: row.get(3)?,
            assigned_engineer: row.get(4)?,
            notes: row.get(5)?,
        })
    })?;

    let mut count = 0;
    for row in rows {
        let record = row?;
        let extensions = record.extension_count.to_string();
        wtr.write_record([
            record.customer.as_str(),
            record.vm_name.as_deref().unwrap_or(""),
            record.system_type.as_deref().unwrap_or(""),
            extensions.as_str(),
            record.assigned_engineer.as_deref().unwrap_or(""),
            record.notes.as_deref().unwrap_or(""),
        ])?;
        count += 1;
    }
    wtr.flush()?;

    Ok(count)
}

// ============================================================================
// TESTS
// ============================================================================
