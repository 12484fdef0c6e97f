use anyhow::{bail, Context, Result};
use rusqlite::Connection;

/// Schema steps in order; entry `i` moves the database to version `i + 1`.
const MIGRATIONS: &[(&str, &str)] = &[
    ("kv_entries", include_str!("schemas/schema_v1.sql")),
    ("outbox", include_str!("schemas/schema_v2.sql")),
];

fn schema_version() -> i32 {
    MIGRATIONS.len() as i32
}

fn read_version(conn: &Connection) -> Result<i32> {
    conn.pragma_query_value(None, "user_version", |row| row.get(0))
        .context("failed to read user_version pragma")
}

/// Brings the database up to the latest schema inside one transaction.
pub fn run_migrations(conn: &mut Connection) -> Result<()> {
    let target = schema_version();
    let version = read_version(conn)?;

    if version > target {
        bail!("database schema v{version} is newer than this build understands (v{target})");
    }
    if version == target {
        return Ok(());
    }

    let tx = conn
        .transaction()
        .context("failed to open migration transaction")?;

    let pending = MIGRATIONS.iter().zip(1..).skip(version.max(0) as usize);
    for (&(name, sql), next) in pending {
        tx.execute_batch(sql)
            .with_context(|| format!("migration v{next} ({name}) failed"))?;
    }

    tx.pragma_update(None, "user_version", target)
        .context("failed to update user_version pragma")?;
    tx.commit().context("failed to commit migrations")?;

    Ok(())
}
