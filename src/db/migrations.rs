use anyhow::{bail, Context, Result};
use log::info;
use rusqlite::Connection;

/// Schema scripts in order; entry `n` upgrades the store to version `n + 1`.
const MIGRATIONS: &[(&str, &str)] = &[
    ("captures table", include_str!("schemas/schema_v1.sql")),
    // synced_at records when a delivery was accepted
    ("sync bookkeeping", include_str!("schemas/schema_v2.sql")),
];

pub(crate) const CURRENT_SCHEMA_VERSION: i32 = MIGRATIONS.len() as i32;

/// Bring the capture store up to `CURRENT_SCHEMA_VERSION`. All pending steps
/// commit together or not at all.
pub fn run_migrations(conn: &mut Connection) -> Result<()> {
    let stored: i32 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .context("failed to read capture store version")?;

    if stored > CURRENT_SCHEMA_VERSION {
        bail!(
            "capture store version {stored} was written by a newer build (this build knows {CURRENT_SCHEMA_VERSION})"
        );
    }

    let Ok(applied) = usize::try_from(stored) else {
        bail!("capture store version {stored} is not valid");
    };
    let pending = &MIGRATIONS[applied..];
    if pending.is_empty() {
        return Ok(());
    }

    let tx = conn
        .transaction()
        .context("failed to begin capture store upgrade")?;

    for (offset, (label, script)) in pending.iter().enumerate() {
        let target = stored + offset as i32 + 1;
        tx.execute_batch(script)
            .with_context(|| format!("upgrade to version {target} ({label}) failed"))?;
        info!("Capture store upgraded to version {target}: {label}");
    }

    tx.pragma_update(None, "user_version", CURRENT_SCHEMA_VERSION)
        .context("failed to record capture store version")?;
    tx.commit().context("failed to commit capture store upgrade")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_exists(conn: &Connection, name: &str) -> bool {
        conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [name],
            |row| row.get::<_, i64>(0),
        )
        .unwrap()
            == 1
    }

    #[test]
    fn migrations_are_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        run_migrations(&mut conn).unwrap();
        run_migrations(&mut conn).unwrap();

        assert!(table_exists(&conn, "captures"));
        let version: i32 = conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap();
        assert_eq!(version, CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn version_one_store_keeps_its_rows_after_upgrade() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(MIGRATIONS[0].1).unwrap();
        conn.pragma_update(None, "user_version", 1).unwrap();
        conn.execute(
            "INSERT INTO captures (id, content, created_at, target_day, synced)
             VALUES ('a', 'note', '2025-04-06T09:00:00.000000Z', '2025-04-06', 0)",
            [],
        )
        .unwrap();

        run_migrations(&mut conn).unwrap();

        let (content, synced_at): (String, Option<String>) = conn
            .query_row(
                "SELECT content, synced_at FROM captures WHERE id = 'a'",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(content, "note");
        assert!(synced_at.is_none());
    }

    #[test]
    fn rejects_newer_schema() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.pragma_update(None, "user_version", CURRENT_SCHEMA_VERSION + 1)
            .unwrap();
        assert!(run_migrations(&mut conn).is_err());
        assert!(!table_exists(&conn, "captures"));
    }
}
