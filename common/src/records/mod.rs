// SPDX-FileCopyrightText: 2025 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Records owned by a user and kept in sync between the client and the server.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Serialize, de::DeserializeOwned};

use crate::{identifiers::Identifier, validation::ValidationError};

pub use account::Account;
pub use debt::{Debt, DebtKind, DebtStatus, NewPayment, Payment};
pub use transaction::{Transaction, TransactionKind};
pub use user::User;

mod account;
mod debt;
mod transaction;
mod user;

/// The kinds of records which are stored per user on the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Transactions,
    Debts,
}

impl ResourceKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Transactions => "transactions",
            Self::Debts => "debts",
        }
    }

    /// Human readable name of a single record.
    pub const fn record_name(&self) -> &'static str {
        match self {
            Self::Transactions => "Transaction",
            Self::Debts => "Debt record",
        }
    }

    /// Name of the blob store holding the records of all users.
    pub const fn store_name(&self) -> &'static str {
        match self {
            Self::Transactions => "transactions_store",
            Self::Debts => "debts_store",
        }
    }

    /// REST collection path of the records.
    pub const fn api_path(&self) -> &'static str {
        match self {
            Self::Transactions => "/api/transactions",
            Self::Debts => "/api/debts",
        }
    }

    /// Key of the blob holding the records of the given user.
    pub fn blob_key(&self, username: &str) -> String {
        format!("{}_{username}", self.as_str())
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ResourceKind {
    type Err = UnknownResourceKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "transactions" => Ok(Self::Transactions),
            "debts" => Ok(Self::Debts),
            _ => Err(UnknownResourceKind(s.to_owned())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown resource kind: {0}")]
pub struct UnknownResourceKind(String);

/// A record which is stored as an element of a per-user list.
pub trait Record:
    Clone + fmt::Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    type Id: Identifier;

    const KIND: ResourceKind;

    fn id(&self) -> Self::Id;

    fn set_id(&mut self, id: Self::Id);

    fn date(&self) -> DateTime<Utc>;

    fn validate(&self) -> Result<(), ValidationError>;

    /// Returns the record which replaces `self` when `update` is written over it.
    ///
    /// The id of `update` is already set to the id of `self`.
    fn merge_update(&self, update: Self) -> Self {
        update
    }
}

/// Sorts records with the most recent first.
pub fn sort_by_date_desc<R: Record>(records: &mut [R]) {
    records.sort_by_key(|record| std::cmp::Reverse(record.date()));
}
