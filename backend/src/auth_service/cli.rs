// SPDX-FileCopyrightText: 2025 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use ledgercommon::records::ResourceKind;

use crate::{auth_service::AuthService, errors::AuthError};

impl AuthService {
    pub async fn user_stats(&self) -> Result<UserStats, AuthError> {
        let users = self.load_users().await?.len();
        let with_transactions = self
            .blobs
            .list_keys(ResourceKind::Transactions.store_name())
            .await?
            .len();
        let with_debts = self
            .blobs
            .list_keys(ResourceKind::Debts.store_name())
            .await?
            .len();
        Ok(UserStats {
            users,
            with_transactions,
            with_debts,
        })
    }
}

pub struct UserStats {
    pub users: usize,
    pub with_transactions: usize,
    pub with_debts: usize,
}
