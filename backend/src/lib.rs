// SPDX-FileCopyrightText: 2023 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Server side logic: per-user record lists and user accounts kept in a
//! key-value blob store.

pub mod auth_service;
pub mod blob_store;
pub mod errors;
pub mod ledger_service;
pub mod settings;

mod key_lock;

#[cfg(test)]
pub(crate) fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}
