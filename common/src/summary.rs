// SPDX-FileCopyrightText: 2025 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Totals shown on the dashboard.

use serde::{Deserialize, Serialize};

use crate::{
    Amount,
    records::{Debt, DebtKind, Transaction, TransactionKind},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionSummary {
    pub total_income: Amount,
    pub total_expenses: Amount,
    pub balance: Amount,
}

impl TransactionSummary {
    pub fn from_transactions<'a>(transactions: impl IntoIterator<Item = &'a Transaction>) -> Self {
        let mut summary = Self::default();
        for transaction in transactions {
            match transaction.kind {
                TransactionKind::Income => summary.total_income += transaction.amount,
                TransactionKind::Expense => summary.total_expenses += transaction.amount,
            }
        }
        summary.balance = summary.total_income - summary.total_expenses;
        summary
    }
}

/// Totals over debt records.
///
/// `total_debtors` and `total_debts` are the sums of the original amounts.
/// The outstanding totals subtract what was already paid back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebtSummary {
    pub debtor_count: usize,
    pub debt_count: usize,
    pub total_debtors: Amount,
    pub total_debts: Amount,
    pub outstanding_debtors: Amount,
    pub outstanding_debts: Amount,
}

impl DebtSummary {
    pub fn from_debts<'a>(debts: impl IntoIterator<Item = &'a Debt>) -> Self {
        let mut summary = Self::default();
        for debt in debts {
            match debt.kind {
                DebtKind::Debtor => {
                    summary.debtor_count += 1;
                    summary.total_debtors += debt.amount;
                    summary.outstanding_debtors += debt.remaining();
                }
                DebtKind::Debt => {
                    summary.debt_count += 1;
                    summary.total_debts += debt.amount;
                    summary.outstanding_debts += debt.remaining();
                }
            }
        }
        summary
    }
}
