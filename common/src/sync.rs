// SPDX-FileCopyrightText: 2025 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Mutations made while offline, waiting to be replayed against the server.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    identifiers::DebtId,
    records::{NewPayment, Record},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Add,
    Update,
    Delete,
    Payment,
}

impl OperationKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Payment => "payment",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown operation kind: {0}")]
pub struct UnknownOperationKind(String);

impl FromStr for OperationKind {
    type Err = UnknownOperationKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "add" => Ok(Self::Add),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            "payment" => Ok(Self::Payment),
            other => Err(UnknownOperationKind(other.to_owned())),
        }
    }
}

/// A queued mutation of a record.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOperation<R: Record> {
    Add(R),
    Update(R),
    Delete { id: R::Id },
}

impl<R: Record> SyncOperation<R> {
    pub fn id(&self) -> R::Id {
        match self {
            Self::Add(record) | Self::Update(record) => record.id(),
            Self::Delete { id } => *id,
        }
    }

    pub fn kind(&self) -> OperationKind {
        match self {
            Self::Add(_) => OperationKind::Add,
            Self::Update(_) => OperationKind::Update,
            Self::Delete { .. } => OperationKind::Delete,
        }
    }

    /// Applies the operation to a list of records.
    ///
    /// Adds and updates of a record that is already in the list replace it.
    pub fn apply_to(&self, records: &mut Vec<R>) {
        match self {
            Self::Add(record) | Self::Update(record) => {
                match records.iter_mut().find(|r| r.id() == record.id()) {
                    Some(existing) => *existing = existing.merge_update(record.clone()),
                    None => records.push(record.clone()),
                }
            }
            Self::Delete { id } => records.retain(|r| r.id() != *id),
        }
    }
}

/// A queued partial payment of a debt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentOperation {
    pub debt_id: DebtId,
    pub payment: NewPayment,
}
