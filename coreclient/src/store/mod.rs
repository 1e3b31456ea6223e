// SPDX-FileCopyrightText: 2025 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Persistent client state: cached records, accounts, the sync queue and the
//! session.

use std::{path::Path, str::FromStr, time::Duration};

use sqlx::{
    SqlitePool, SqliteTransaction,
    migrate::MigrateError,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
};
use thiserror::Error;
use tracing::info;

pub(crate) mod accounts;
pub(crate) mod records;
pub(crate) mod session;

pub use session::StoredSession;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Migrate(#[from] MigrateError),
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
    #[error("Corrupted row in {table}: {reason}")]
    Corrupted { table: &'static str, reason: String },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Handle to the local sqlite database.
#[derive(Debug, Clone)]
pub struct LocalStore {
    pool: SqlitePool,
}

impl LocalStore {
    /// Opens the database at `path`, creating it if needed.
    pub async fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Opening local store");
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));
        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        Self::migrate(pool).await
    }

    /// Opens a database which lives only as long as the returned store.
    pub async fn in_memory() -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        // Every connection to `:memory:` is a database of its own.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        Self::migrate(pool).await
    }

    async fn migrate(pool: SqlitePool) -> StoreResult<Self> {
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Executes a function with a transaction.
    ///
    /// The transaction is committed if the function returns `Ok`, and rolled
    /// back if the function returns `Err`.
    pub(crate) async fn with_transaction<T: Send, E: From<sqlx::Error>>(
        &self,
        f: impl AsyncFnOnce(&mut SqliteTransaction<'_>) -> Result<T, E>,
    ) -> Result<T, E> {
        let mut txn = self.pool.begin_with("BEGIN IMMEDIATE").await?;
        let value = f(&mut txn).await?;
        txn.commit().await?;
        Ok(value)
    }

    /// Removes everything belonging to the logged in user.
    pub(crate) async fn clear(&self) -> StoreResult<()> {
        self.with_transaction(async |txn| {
            sqlx::query("DELETE FROM local_record")
                .execute(txn.as_mut())
                .await?;
            sqlx::query("DELETE FROM account")
                .execute(txn.as_mut())
                .await?;
            sqlx::query("DELETE FROM sync_queue")
                .execute(txn.as_mut())
                .await?;
            sqlx::query("DELETE FROM session")
                .execute(txn.as_mut())
                .await?;
            Ok::<_, StoreError>(())
        })
        .await
    }
}
