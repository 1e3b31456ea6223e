// SPDX-FileCopyrightText: 2025 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::sync::Arc;

use ledgerbackend::{auth_service::AuthService, blob_store::BlobStore};

use crate::args::{UsersArgs, UsersCommand};

pub async fn run_users_command(args: UsersArgs, blobs: Arc<dyn BlobStore>) -> anyhow::Result<()> {
    let auth_service = AuthService::new(blobs);

    match args.cmd.unwrap_or_default() {
        UsersCommand::Stats => {
            let stats = auth_service.user_stats().await?;
            println!("Registered users: {}", stats.users);
            println!("Users with transactions: {}", stats.with_transactions);
            println!("Users with debt records: {}", stats.with_debts);
        }
        UsersCommand::List { n, details } => {
            let users = auth_service.list_users().await?;
            for user in users.into_iter().take(n) {
                if details {
                    println!("{}\t{}\t{}", user.username, user.full_name(), user.mobile);
                } else {
                    println!("{}", user.username);
                }
            }
        }
    }

    Ok(())
}
