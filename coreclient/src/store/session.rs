// SPDX-FileCopyrightText: 2025 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use chrono::{DateTime, Utc};
use ledgercommon::records::User;
use sqlx::{SqliteExecutor, query, query_as};
use zeroize::Zeroizing;

use super::{StoreError, StoreResult};

/// The logged in user together with the session token.
#[derive(Debug, Clone)]
pub struct StoredSession {
    pub user: User,
    pub token: Zeroizing<String>,
    pub created_at: DateTime<Utc>,
}

impl StoredSession {
    pub(crate) fn new(user: User, token: String) -> Self {
        Self {
            user,
            token: Zeroizing::new(token),
            created_at: Utc::now(),
        }
    }

    pub(crate) async fn load(executor: impl SqliteExecutor<'_>) -> StoreResult<Option<Self>> {
        let row: Option<(String, String, DateTime<Utc>)> =
            query_as("SELECT user, token, created_at FROM session WHERE id = 0")
                .fetch_optional(executor)
                .await?;
        let Some((user, token, created_at)) = row else {
            return Ok(None);
        };
        let user = serde_json::from_str(&user).map_err(|error| StoreError::Corrupted {
            table: "session",
            reason: error.to_string(),
        })?;
        Ok(Some(Self {
            user,
            token: Zeroizing::new(token),
            created_at,
        }))
    }

    pub(crate) async fn store(&self, executor: impl SqliteExecutor<'_>) -> StoreResult<()> {
        query(
            "INSERT INTO session (id, user, token, created_at) VALUES (0, ?1, ?2, ?3)
            ON CONFLICT (id) DO UPDATE
            SET user = excluded.user, token = excluded.token, created_at = excluded.created_at",
        )
        .bind(serde_json::to_string(&self.user)?)
        .bind(self.token.as_str())
        .bind(self.created_at)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub(crate) async fn delete(executor: impl SqliteExecutor<'_>) -> StoreResult<()> {
        query("DELETE FROM session").execute(executor).await?;
        Ok(())
    }
}
