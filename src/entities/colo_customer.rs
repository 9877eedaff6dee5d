// Colo Customer Entity - Colocation footprint rows from the facility export
//
// The colo sheet names its customer column "Customer Name" rather than
// "Customer"; the alias table is the only place that difference lives.

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

const CUSTOMER_NAME: &[&str] = &["Customer Name", "customer_name"];
const RACK_LOCATION: &[&str] = &["Rack Location", "rack_location"];
const NEW_CABINET_NUMBER: &[&str] = &["New Cabinet Number", "new_cabinet_number"];
const EQUIPMENT_COUNT: &[&str] = &["Equipment Count", "equipment_count"];
const POWER_USAGE: &[&str] = &["Power Usage", "power_usage"];
const ASSIGNED_ENGINEER: &[&str] = &["Assigned Engineer", "assigned_engineer"];
const NOTES: &[&str] = &["Notes", "notes"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColoCustomerRecord {
    pub customer_name: String,
    pub rack_location: Option<String>,
    pub new_cabinet_number: Option<String>,
    pub equipment_count: i64,
    pub power_usage: f64,
    pub assigned_engineer: Option<String>,
    pub notes: Option<String>,
}

fn read_csv<R: io::Read>(reader: R) -> Result<Vec<ColoCustomerRecord>, ImportError> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mapper = RowMapper::new(rdr.headers()?);

    if !mapper.has_any(CUSTOMER_NAME) {
        warn!("colo customers CSV has no recognizable customer column; all rows will resolve to the sentinel customer");
    }

    let mut records = Vec::new();
    for result in rdr.records() {
        let row = result?;
        records.push(ColoCustomerRecord {
            customer_name: mapper.get(&row, CUSTOMER_NAME).unwrap_or("").to_string(),
            rack_location: mapper.get(&row, RACK_LOCATION).map(str::to_string),
            new_cabinet_number: mapper.get(&row, NEW_CABINET_NUMBER).map(str::to_string),
            equipment_count: parse_int(mapper.get(&row, EQUIPMENT_COUNT)),
            power_usage: parse_float(mapper.get(&row, POWER_USAGE)),
            assigned_engineer: mapper.get(&row, ASSIGNED_ENGINEER).map(str::to_string),
            notes: mapper.get(&row, NOTES).map(str::to_string),
        });
    }
    Ok(records)
}

/// Import a colo customers CSV inside a single transaction.
pub fn import_colo_customers<R: io::Read>(
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
        let memo =
            resolver.process_batch(records.iter().map(|r| r.customer_name.as_str()))?;

        let now = Utc::now().to_rfc3339();
        for record in &records {
            tx.execute(
                "INSERT INTO colo_customers (
                    customer_name, customer_id, rack_location, new_cabinet_number,
                    equipment_count, power_usage, assigned_engineer, notes, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    record.customer_name,
                    memo[&record.customer_name],
                    record.rack_location,
                    record.new_cabinet_number,
                    record.equipment_count,
                    record.power_usage,
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

/// Import a colo customers CSV from a file on disk.
pub fn import_colo_customers_from_path(
    conn: &mut Connection,
    path: &Path,
    config: &ResolverConfig,
) -> Result<ImportSummary, ImportError> {
    let file = std::fs::File::open(path)?;
    import_colo_customers(conn, file, config)
}

/// Export all colo customers with the canonical header names.
pub fn export_colo_customers<W: io::Write>(
    conn: &Connection,
    writer: W,
) -> Result<usize, ImportError> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record([
        "Customer Name",
        "Rack Location",
        "New Cabinet Number",
        "Equipment Count",
        "Power Usage",
        "Assigned Engineer",
        "Notes",
    ])?;

    let mut stmt = conn.prepare(
        "SELECT customer_name, rack_location, new_cabinet_number, equipment_count,
                power_usage, assigned_engineer, notes
         FROM colo_customers ORDER BY id",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(ColoCustomerRecord {
            customer_name: row.get(0)?,
            rack_location: row.get(1)?,
            new_cabinet_number: row.get(2)?,
            equipment_count: row.get(3)?,
            power_usage: row.get(4)?,
            assigned_engineer: row.get(5)?,
            notes: row.get(6)?,
        })
    })?;

    let mut count = 0;
    for row in rows {
        let record = row?;
        let equipment = record.equipment_count.to_string();
        let power = record.power_usage.to_string();
        wtr.write_record([
            record.customer_name.as_str(),
            record.rack_location.as_deref().unwrap_or(""),
            record.new_cabinet_number.as_deref().unwrap_or(""),
            equipment.as_str(),
            power.as_str(),
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
