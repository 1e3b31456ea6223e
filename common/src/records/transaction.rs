// SPDX-FileCopyrightText: 2025 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    Amount,
    identifiers::TransactionId,
    validation::{self, MIN_REASON_LEN, ValidationError},
};

use super::{Record, ResourceKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Income,
    Expense,
}

/// An income or expense entered by the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    #[serde(default)]
    pub id: TransactionId,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub amount: Amount,
    pub date: DateTime<Utc>,
    pub reason: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_name: Option<String>,
}

impl Transaction {
    pub fn is_income(&self) -> bool {
        self.kind == TransactionKind::Income
    }

    pub fn is_expense(&self) -> bool {
        self.kind == TransactionKind::Expense
    }
}

impl Record for Transaction {
    type Id = TransactionId;

    const KIND: ResourceKind = ResourceKind::Transactions;

    fn id(&self) -> TransactionId {
        self.id
    }

    fn set_id(&mut self, id: TransactionId) {
        self.id = id;
    }

    fn date(&self) -> DateTime<Utc> {
        self.date
    }

    fn validate(&self) -> Result<(), ValidationError> {
        validation::positive_amount(self.amount)?;
        validation::min_len("Reason", &self.reason, MIN_REASON_LEN)?;
        if self.category.trim().is_empty() {
            return Err(ValidationError::MissingCategory);
        }
        Ok(())
    }
}
