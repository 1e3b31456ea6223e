// SPDX-FileCopyrightText: 2025 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use ledgercommon::{identifiers::AccountId, records::Account, validation::ValidationError};
use tracing::info;

use crate::store::accounts;

use super::CoreUser;

impl CoreUser {
    pub async fn accounts(&self) -> anyhow::Result<Vec<Account>> {
        Ok(accounts::load_all(self.store().pool()).await?)
    }

    /// Adds an account. Names are unique, ignoring case.
    pub async fn add_account(&self, name: &str) -> anyhow::Result<Account> {
        let account = Account::new(name)?;
        self.store()
            .with_transaction(async |txn| {
                if accounts::name_taken(txn.as_mut(), &account.name).await? {
                    return Err(ValidationError::DuplicateAccount.into());
                }
                accounts::insert(txn.as_mut(), &account).await?;
                Ok::<_, anyhow::Error>(())
            })
            .await?;
        info!(name = %account.name, "Added account");
        Ok(account)
    }

    /// Returns whether the account existed.
    pub async fn remove_account(&self, id: AccountId) -> anyhow::Result<bool> {
        Ok(accounts::delete(self.store().pool(), id).await?)
    }
}
