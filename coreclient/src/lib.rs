// SPDX-FileCopyrightText: 2023 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Offline first client logic.
//!
//! All reads are served from a local sqlite cache. Changes are written to the
//! cache and to a queue, which is replayed against the server in order while
//! the client is online.

mod core_user;
mod error;
mod remote;
mod store;
mod sync_queue;
mod sync_service;
mod utils;

pub use crate::{
    core_user::CoreUser,
    error::{RecordNotFound, SyncError},
    remote::RemoteLedger,
    store::{LocalStore, StoreError, StoredSession},
    sync_queue::{PendingOperation, QueuedOperation},
    sync_service::{SyncDone, SyncReport, SyncStatus},
};

pub use ledgercommon::{
    identifiers::{AccountId, DebtId, Identifier, PaymentId, TransactionId},
    records::{
        Account, Debt, DebtKind, DebtStatus, NewPayment, Payment, Transaction, TransactionKind,
        User,
    },
    report::MonthlyReport,
    summary::{DebtSummary, TransactionSummary},
};
