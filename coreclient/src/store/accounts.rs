// SPDX-FileCopyrightText: 2025 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use chrono::Utc;
use ledgercommon::{identifiers::AccountId, records::Account};
use sqlx::{SqliteExecutor, query, query_as, query_scalar};

use super::{StoreError, StoreResult};

/// Accounts in the order they were added.
pub(crate) async fn load_all(executor: impl SqliteExecutor<'_>) -> StoreResult<Vec<Account>> {
    let rows: Vec<(String, String)> =
        query_as("SELECT id, name FROM account ORDER BY created_at ASC, rowid ASC")
            .fetch_all(executor)
            .await?;
    rows.into_iter()
        .map(|(id, name)| {
            let id = id.parse().map_err(|error| StoreError::Corrupted {
                table: "account",
                reason: format!("invalid id {id}: {error}"),
            })?;
            Ok(Account { id, name })
        })
        .collect()
}

/// Whether an account with the same name, ignoring case, exists.
pub(crate) async fn name_taken(executor: impl SqliteExecutor<'_>, name: &str) -> StoreResult<bool> {
    let taken = query_scalar("SELECT EXISTS (SELECT 1 FROM account WHERE name = ?1 COLLATE NOCASE)")
        .bind(name)
        .fetch_one(executor)
        .await?;
    Ok(taken)
}

pub(crate) async fn insert(executor: impl SqliteExecutor<'_>, account: &Account) -> StoreResult<()> {
    query("INSERT INTO account (id, name, created_at) VALUES (?1, ?2, ?3)")
        .bind(account.id.to_string())
        .bind(&account.name)
        .bind(Utc::now())
        .execute(executor)
        .await?;
    Ok(())
}

pub(crate) async fn delete(executor: impl SqliteExecutor<'_>, id: AccountId) -> StoreResult<bool> {
    let result = query("DELETE FROM account WHERE id = ?1")
        .bind(id.to_string())
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use crate::store::LocalStore;

    use super::*;

    #[tokio::test]
    async fn names_are_unique_ignoring_case() {
        let store = LocalStore::in_memory().await.unwrap();
        let wallet = Account::new("Wallet").unwrap();
        let bank = Account::new("Bank").unwrap();
        insert(store.pool(), &wallet).await.unwrap();
        insert(store.pool(), &bank).await.unwrap();

        assert!(name_taken(store.pool(), "wallet").await.unwrap());
        assert!(!name_taken(store.pool(), "Savings").await.unwrap());
        assert!(insert(store.pool(), &Account::new("WALLET").unwrap()).await.is_err());

        assert_eq!(load_all(store.pool()).await.unwrap(), vec![wallet.clone(), bank]);
        assert!(delete(store.pool(), wallet.id).await.unwrap());
        assert!(!delete(store.pool(), wallet.id).await.unwrap());
    }
}
