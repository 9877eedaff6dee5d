// Migration Tracker CLI - Import/export inventory CSVs against a SQLite file

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use rusqlite::Connection;

use migration_tracker::entities::colo_customer::import_colo_customers_from_path;
use migration_tracker::entities::server::import_servers_from_path;
use migration_tracker::entities::voice_system::import_voice_systems_from_path;
use migration_tracker::{
    count_customers, export_colo_customers, export_servers, export_voice_systems, setup_database,
    ImportSummary, ResolverConfig,
};

const DEFAULT_DB: &str = "migration-tracker.db";

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    let opts = Options::parse(&args[1..])?;

    match opts.command.as_deref() {
        Some("import") => run_import(&opts),
        Some("export") => run_export(&opts),
        Some("customers") => run_customers(&opts),
        _ => {
            print_usage();
            Ok(())
        }
    }
}

struct Options {
    command: Option<String>,
    entity: Option<String>,
    file: Option<PathBuf>,
    db_path: PathBuf,
    config_path: Option<PathBuf>,
}

impl Options {
    fn parse(args: &[String]) -> Result<Options> {
        let mut opts = Options {
            command: None,
            entity: None,
            file: None,
            db_path: PathBuf::from(DEFAULT_DB),
            config_path: None,
        };

        let mut positional = Vec::new();
        let mut i = 0;
        while i < args.len() {
            match args[i].as_str() {
                "--db" => {
                    i += 1;
                    let value = args.get(i).context("--db requires a path")?;
                    opts.db_path = PathBuf::from(value);
                }
                "--config" => {
                    i += 1;
                    let value = args.get(i).context("--config requires a path")?;
                    opts.config_path = Some(PathBuf::from(value));
                }
                flag if flag.starts_with("--") => bail!("unknown flag: {flag}"),
                other => positional.push(other.to_string()),
            }
            i += 1;
        }

        let mut positional = positional.into_iter();
        opts.command = positional.next();
        opts.entity = positional.next();
        opts.file = positional.next().map(PathBuf::from);
        Ok(opts)
    }

    fn resolver_config(&self) -> Result<ResolverConfig> {
        match &self.config_path {
            Some(path) => ResolverConfig::load(path)
                .with_context(|| format!("loading config from {}", path.display())),
            None => Ok(ResolverConfig::default()),
        }
    }
}

fn open_database(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)
        .with_context(|| format!("opening database {}", path.display()))?;
    setup_database(&conn)?;
    Ok(conn)
}

fn run_import(opts: &Options) -> Result<()> {
    let entity = opts.entity.clone().context("import requires an entity: servers | voice | colo")?;
    let file = opts.file.clone().context("import requires a CSV file path")?;
    let config = opts.resolver_config()?;

    let mut conn = open_database(&opts.db_path)?;

    let summary = match entity.as_str() {
        "servers" => import_servers_from_path(&mut conn, &file, &config)?,
        "voice" => import_voice_systems_from_path(&mut conn, &file, &config)?,
        "colo" => import_colo_customers_from_path(&mut conn, &file, &config)?,
        other => bail!("unknown entity '{other}' (expected servers | voice | colo)"),
    };

    print_summary(&entity, &summary);
    Ok(())
}

fn print_summary(entity: &str, summary: &ImportSummary) {
    println!("✓ Imported {} {} row(s)", summary.rows, entity);
    println!("  Customers created:       {}", summary.resolution.created);
    println!("  Matched exactly:         {}", summary.resolution.matched_exact);
    println!("  Matched fuzzily:         {}", summary.resolution.matched_fuzzy);
    println!("  Blank (sentinel) names:  {}", summary.resolution.blank);
}

fn run_export(opts: &Options) -> Result<()> {
    let entity = opts.entity.as_deref().context("export requires an entity: servers | voice | colo")?;
    let conn = open_database(&opts.db_path)?;
    let stdout = std::io::stdout();

    let count = match entity {
        "servers" => export_servers(&conn, stdout.lock())?,
        "voice" => export_voice_systems(&conn, stdout.lock())?,
        "colo" => export_colo_customers(&conn, stdout.lock())?,
        other => bail!("unknown entity '{other}' (expected servers | voice | colo)"),
    };

    eprintln!("✓ Exported {count} {entity} row(s)");
    Ok(())
}

fn run_customers(opts: &Options) -> Result<()> {
    let conn = open_database(&opts.db_path)?;

    let mut stmt = conn.prepare("SELECT id, name FROM customers ORDER BY id")?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
    })?;

    for row in rows {
        let (id, name) = row?;
        println!("{id:>6}  {name}");
    }
    println!("✓ {} customer(s) total", count_customers(&conn)?);
    Ok(())
}

fn print_usage() {
    println!("migration-tracker {}", migration_tracker::VERSION);
    println!();
    println!("Usage:");
    println!("  migration-tracker import <servers|voice|colo> <csv> [--db <path>] [--config <path>]");
    println!("  migration-tracker export <servers|voice|colo> [--db <path>]");
    println!("  migration-tracker customers [--db <path>]");
}
