//! SQLite implementation of the KeyStore trait.
//!
//! This is the primary storage backend. It uses rusqlite with bundled
//! SQLite, wrapped in async via tokio::spawn_blocking.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, TransactionBehavior};
use rxgate_core::AccountId;

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{now_millis, KeyEvent, KeyEventKind, KeyStore, StoredKey};

/// SQLite-based key store.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime. Writes run in IMMEDIATE
/// transactions so a reset is never observed half-applied.
pub struct SqliteKeyStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteKeyStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path).map_err(classify)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a blocking operation on the connection.
    async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);

        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| StoreError::InvalidData(format!("mutex poisoned: {}", e)))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::InvalidData(format!("spawn_blocking failed: {}", e)))?
    }
}

/// Map SQLite errors, treating an unreachable database as unavailable
/// infrastructure rather than a data defect.
fn classify(e: rusqlite::Error) -> StoreError {
    match &e {
        rusqlite::Error::SqliteFailure(err, _)
            if matches!(
                err.code,
                ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked | ErrorCode::CannotOpen
            ) =>
        {
            StoreError::Unavailable(e.to_string())
        }
        _ => StoreError::Database(e),
    }
}

fn active_generation(conn: &Connection, account: &str) -> Result<Option<u64>> {
    let generation: Option<i64> = conn
        .query_row(
            "SELECT generation FROM account_keys WHERE account_id = ?1",
            params![account],
            |row| row.get(0),
        )
        .optional()
        .map_err(classify)?;
    Ok(generation.map(|g| g as u64))
}

fn record_event(
    conn: &Connection,
    account: &str,
    generation: u64,
    kind: KeyEventKind,
    at: i64,
) -> Result<()> {
    conn.execute(
        "INSERT INTO key_events (account_id, generation, kind, at) VALUES (?1, ?2, ?3, ?4)",
        params![account, generation as i64, kind.as_str(), at],
    )
    .map_err(classify)?;
    Ok(())
}

fn bump_issuance(conn: &Connection, account: &str, generation: u64) -> Result<()> {
    conn.execute(
        "INSERT INTO key_issuance (account_id, last_generation) VALUES (?1, ?2)
         ON CONFLICT(account_id) DO UPDATE
         SET last_generation = MAX(last_generation, excluded.last_generation)",
        params![account, generation as i64],
    )
    .map_err(classify)?;
    Ok(())
}

#[async_trait]
impl KeyStore for SqliteKeyStore {
    async fn get(&self, account: &AccountId) -> Result<Option<StoredKey>> {
        let account = account.clone();

        self.run(move |conn| {
            conn.query_row(
                "SELECT material, generation, issued_at FROM account_keys WHERE account_id = ?1",
                params![account.as_str()],
                |row| {
                    Ok(StoredKey {
                        account: account.clone(),
                        material: row.get(0)?,
                        generation: row.get::<_, i64>(1)? as u64,
                        issued_at: row.get(2)?,
                    })
                },
            )
            .optional()
            .map_err(classify)
        })
        .await
    }

    async fn invalidate_and_issue(&self, account: &AccountId) -> Result<StoredKey> {
        let account = account.clone();

        self.run(move |conn| {
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(classify)?;

            let active = active_generation(&tx, account.as_str())?.unwrap_or(0);
            let issued: i64 = tx
                .query_row(
                    "SELECT last_generation FROM key_issuance WHERE account_id = ?1",
                    params![account.as_str()],
                    |row| row.get(0),
                )
                .optional()
                .map_err(classify)?
                .unwrap_or(0);

            let generation = active.max(issued as u64) + 1;
            let now = now_millis();

            bump_issuance(&tx, account.as_str(), generation)?;
            record_event(&tx, account.as_str(), generation, KeyEventKind::Issued, now)?;
            tx.commit().map_err(classify)?;

            Ok(StoredKey::issue(account, generation, now))
        })
        .await
    }

    async fn set(&self, account: &AccountId, key: StoredKey) -> Result<()> {
        if &key.account != account {
            return Err(StoreError::InvalidData(format!(
                "key for {} cannot be set on {}",
                key.account, account
            )));
        }

        let account = account.clone();

        self.run(move |conn| {
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(classify)?;

            if let Some(active) = active_generation(&tx, account.as_str())? {
                if key.generation <= active {
                    return Err(StoreError::StaleGeneration {
                        account: account.to_string(),
                        attempted: key.generation,
                        active,
                    });
                }
            }

            let now = now_millis();
            tx.execute(
                "INSERT INTO account_keys (account_id, material, generation, issued_at, activated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(account_id) DO UPDATE SET
                    material = excluded.material,
                    generation = excluded.generation,
                    issued_at = excluded.issued_at,
                    activated_at = excluded.activated_at",
                params![
                    account.as_str(),
                    key.material,
                    key.generation as i64,
                    key.issued_at,
                    now
                ],
            )
            .map_err(classify)?;

            bump_issuance(&tx, account.as_str(), key.generation)?;
            record_event(
                &tx,
                account.as_str(),
                key.generation,
                KeyEventKind::Activated,
                now,
            )?;
            tx.commit().map_err(classify)?;

            tracing::debug!(account = %account, generation = key.generation, "key activated");
            Ok(())
        })
        .await
    }

    async fn key_history(&self, account: &AccountId) -> Result<Vec<KeyEvent>> {
        let account = account.clone();

        self.run(move |conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT generation, kind, at FROM key_events
                     WHERE account_id = ?1 ORDER BY id",
                )
                .map_err(classify)?;

            let rows = stmt
                .query_map(params![account.as_str()], |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                    ))
                })
                .map_err(classify)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(classify)?;

            rows.into_iter()
                .map(|(generation, kind, at)| -> Result<KeyEvent> {
                    let kind = KeyEventKind::parse(&kind).ok_or_else(|| {
                        StoreError::InvalidData(format!("unknown key event kind: {}", kind))
                    })?;
                    Ok(KeyEvent {
                        account: account.clone(),
                        generation: generation as u64,
                        kind,
                        at,
                    })
                })
                .collect()
        })
        .await
    }
}
