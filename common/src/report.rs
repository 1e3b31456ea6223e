// SPDX-FileCopyrightText: 2025 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Monthly spending report computed from the transactions of one month.

use std::collections::HashMap;

use chrono::{Datelike, Month};
use serde::{Deserialize, Serialize};

use crate::{
    Amount,
    records::{Transaction, TransactionKind},
    validation::ValidationError,
};

/// Number of expense categories listed in a report.
pub const TOP_CATEGORIES: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryTotal {
    pub category: String,
    pub total: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyReport {
    pub year: i32,
    pub month: u32,
    pub total_income: Amount,
    pub total_expenses: Amount,
    pub net: Amount,
    pub transaction_count: usize,
    pub top_categories: Vec<CategoryTotal>,
    pub report: String,
    pub actionable_insight: String,
}

impl MonthlyReport {
    /// Builds the report for `month` (1-12) of `year` out of all `transactions`.
    pub fn generate<'a>(
        transactions: impl IntoIterator<Item = &'a Transaction>,
        year: i32,
        month: u32,
    ) -> Result<Self, ValidationError> {
        let month_name = u8::try_from(month)
            .ok()
            .and_then(|m| Month::try_from(m).ok())
            .ok_or(ValidationError::InvalidMonth(month))?
            .name();

        let mut total_income = Amount::ZERO;
        let mut total_expenses = Amount::ZERO;
        let mut transaction_count = 0;
        let mut by_category: HashMap<&str, Amount> = HashMap::new();
        for transaction in transactions
            .into_iter()
            .filter(|t| t.date.year() == year && t.date.month() == month)
        {
            transaction_count += 1;
            match transaction.kind {
                TransactionKind::Income => total_income += transaction.amount,
                TransactionKind::Expense => {
                    total_expenses += transaction.amount;
                    *by_category.entry(transaction.category.as_str()).or_default() +=
                        transaction.amount;
                }
            }
        }

        let mut top_categories: Vec<CategoryTotal> = by_category
            .into_iter()
            .map(|(category, total)| CategoryTotal {
                category: category.to_owned(),
                total,
            })
            .collect();
        top_categories.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.category.cmp(&b.category)));
        top_categories.truncate(TOP_CATEGORIES);

        let net = total_income - total_expenses;
        let report = describe(
            month_name,
            year,
            total_income,
            total_expenses,
            transaction_count,
            &top_categories,
        );
        let actionable_insight = insight(total_income, total_expenses, &top_categories);

        Ok(Self {
            year,
            month,
            total_income,
            total_expenses,
            net,
            transaction_count,
            top_categories,
            report,
            actionable_insight,
        })
    }
}

fn money(amount: Amount) -> Amount {
    amount.round_dp(2).normalize()
}

fn describe(
    month_name: &str,
    year: i32,
    income: Amount,
    expenses: Amount,
    count: usize,
    top: &[CategoryTotal],
) -> String {
    if count == 0 {
        return format!("No transactions were recorded in {month_name} {year}.");
    }
    let mut report = format!(
        "In {month_name} {year} you earned {} and spent {} across {count} transaction{}.",
        money(income),
        money(expenses),
        if count == 1 { "" } else { "s" },
    );
    if !top.is_empty() {
        let categories: Vec<String> = top
            .iter()
            .map(|c| format!("{} ({})", c.category, money(c.total)))
            .collect();
        report.push_str(" Top spending categories: ");
        report.push_str(&categories.join(", "));
        report.push('.');
    }
    report
}

fn insight(income: Amount, expenses: Amount, top: &[CategoryTotal]) -> String {
    let Some(largest) = top.first() else {
        return "No expenses were recorded this month. Keep tracking to see where your money goes."
            .to_owned();
    };
    if expenses > income {
        return format!(
            "You spent {} more than you earned. Cutting back on {} would help close the gap.",
            money(expenses - income),
            largest.category
        );
    }
    let share = (largest.total / expenses * Amount::ONE_HUNDRED).round();
    format!(
        "{} made up {share}% of your spending. Setting a monthly limit for it is the quickest way to save more.",
        largest.category
    )
}
