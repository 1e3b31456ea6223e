// SPDX-FileCopyrightText: 2025 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{Connection, Executor, PgConnection, PgPool, Row, types::Json};
use tracing::info;

use crate::{errors::StorageError, settings::DatabaseSettings};

use super::BlobStore;

/// Blob store backed by a single Postgres table.
#[derive(Debug, Clone)]
pub struct PgBlobStore {
    pool: PgPool,
}

impl PgBlobStore {
    /// Connects to the configured database, creating it if it does not exist
    /// yet, and runs the migrations.
    pub async fn connect(settings: &DatabaseSettings) -> Result<Self, StorageError> {
        let mut connection =
            PgConnection::connect_with(&settings.server_options()).await?;

        let db_name = settings.name.as_str();
        let db_exists: bool = sqlx::query(
            "SELECT EXISTS (SELECT datname FROM pg_catalog.pg_database WHERE datname = $1)",
        )
        .bind(db_name)
        .fetch_one(&mut connection)
        .await?
        .try_get(0)?;

        if !db_exists {
            info!(db_name, "Creating database");
            connection
                .execute(format!(r#"CREATE DATABASE "{db_name}";"#).as_str())
                .await?;
        }

        let pool = PgPool::connect_with(settings.database_options()).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

mod persistence {
    use super::*;

    #[async_trait]
    impl BlobStore for PgBlobStore {
        async fn get_json(&self, store: &str, key: &str) -> Result<Option<Value>, StorageError> {
            let value: Option<Json<Value>> =
                sqlx::query_scalar("SELECT value FROM blob WHERE store = $1 AND key = $2")
                    .bind(store)
                    .bind(key)
                    .fetch_optional(&self.pool)
                    .await?;
            Ok(value.map(|Json(value)| value))
        }

        async fn set_json(
            &self,
            store: &str,
            key: &str,
            value: &Value,
        ) -> Result<(), StorageError> {
            sqlx::query(
                "INSERT INTO blob (store, key, value, updated_at)
                VALUES ($1, $2, $3, now())
                ON CONFLICT (store, key) DO UPDATE
                SET value = EXCLUDED.value, updated_at = EXCLUDED.updated_at",
            )
            .bind(store)
            .bind(key)
            .bind(Json(value))
            .execute(&self.pool)
            .await?;
            Ok(())
        }

        async fn delete(&self, store: &str, key: &str) -> Result<bool, StorageError> {
            let result = sqlx::query("DELETE FROM blob WHERE store = $1 AND key = $2")
                .bind(store)
                .bind(key)
                .execute(&self.pool)
                .await?;
            Ok(result.rows_affected() > 0)
        }

        async fn list_keys(&self, store: &str) -> Result<Vec<String>, StorageError> {
            let keys = sqlx::query_scalar("SELECT key FROM blob WHERE store = $1 ORDER BY key")
                .bind(store)
                .fetch_all(&self.pool)
                .await?;
            Ok(keys)
        }
    }
}
