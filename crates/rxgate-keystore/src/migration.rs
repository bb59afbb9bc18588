//! Schema migrations for the SQLite key store.
//!
//! Migrations are applied in order inside one transaction; the highest
//! applied version is recorded in `schema_migrations`.

use rusqlite::Connection;

use crate::error::{Result, StoreError};
use crate::traits::now_millis;

/// Ordered `(version, sql)` pairs. Versions start at 1 and are contiguous.
const MIGRATIONS: &[(u32, &str)] = &[(1, V1_KEYS)];

/// Schema version this build writes.
pub const CURRENT_VERSION: u32 = 1;

const V1_KEYS: &str = r#"
    -- Active key per account
    CREATE TABLE account_keys (
        account_id TEXT PRIMARY KEY,
        material BLOB NOT NULL,            -- 32 bytes when well-formed
        generation INTEGER NOT NULL,       -- bumped on every reset
        issued_at INTEGER NOT NULL,        -- Unix ms
        activated_at INTEGER NOT NULL      -- Unix ms
    );

    -- Highest generation handed out per account, active or not
    CREATE TABLE key_issuance (
        account_id TEXT PRIMARY KEY,
        last_generation INTEGER NOT NULL
    );

    CREATE TABLE key_events (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        account_id TEXT NOT NULL,
        generation INTEGER NOT NULL,
        kind TEXT NOT NULL,                -- 'issued' | 'activated'
        at INTEGER NOT NULL
    );

    CREATE INDEX idx_key_events_account ON key_events(account_id, id);
"#;

/// Bring the schema up to [`CURRENT_VERSION`]. Safe to call on every open.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        );",
    )?;

    let applied: u32 = conn.query_row(
        "SELECT IFNULL(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    if applied > CURRENT_VERSION {
        return Err(StoreError::Migration(format!(
            "schema version {} was written by a newer build (this build knows {})",
            applied, CURRENT_VERSION
        )));
    }

    let pending: Vec<_> = MIGRATIONS.iter().filter(|(v, _)| *v > applied).collect();
    if pending.is_empty() {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for (version, sql) in pending {
        tx.execute_batch(sql)
            .map_err(|e| StoreError::Migration(format!("v{}: {}", version, e)))?;
        tx.execute(
            "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
            rusqlite::params![version, now_millis()],
        )?;
    }
    tx.commit()?;

    tracing::debug!(from = applied, to = CURRENT_VERSION, "key store schema migrated");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migration_creates_tables() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();

        assert!(tables.contains(&"account_keys".to_string()));
        assert!(tables.contains(&"key_issuance".to_string()));
        assert!(tables.contains(&"key_events".to_string()));
        assert!(tables.contains(&"schema_migrations".to_string()));
    }

    #[test]
    fn test_migration_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();
        migrate(&mut conn).unwrap();

        let (count, version): (u32, u32) = conn
            .query_row(
                "SELECT COUNT(*), MAX(version) FROM schema_migrations",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(count, MIGRATIONS.len() as u32);
        assert_eq!(version, CURRENT_VERSION);
    }

    #[test]
    fn test_newer_schema_rejected() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();
        conn.execute(
            "INSERT INTO schema_migrations (version, applied_at) VALUES (99, 0)",
            [],
        )
        .unwrap();

        assert!(matches!(migrate(&mut conn), Err(StoreError::Migration(_))));
    }
}
