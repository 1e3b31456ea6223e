// SPDX-FileCopyrightText: 2025 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use axum::extract::State;
use ledgercommon::{
    messages::{MonthlyReportQuery, SummaryResponse},
    report::MonthlyReport,
    summary::{DebtSummary, TransactionSummary},
};

use crate::{error::ApiError, session::AuthenticatedUser};

use super::{ApiJson, ApiQuery, AppState};

pub(super) async fn summary(
    AuthenticatedUser(username): AuthenticatedUser,
    State(state): State<AppState>,
) -> Result<ApiJson<SummaryResponse>, ApiError> {
    let transactions = state.transactions.list(&username).await?;
    let debts = state.debts.list(&username).await?;
    Ok(ApiJson(SummaryResponse {
        transactions: TransactionSummary::from_transactions(&transactions),
        debts: DebtSummary::from_debts(&debts),
    }))
}

pub(super) async fn monthly_report(
    AuthenticatedUser(username): AuthenticatedUser,
    State(state): State<AppState>,
    ApiQuery(MonthlyReportQuery { year, month }): ApiQuery<MonthlyReportQuery>,
) -> Result<ApiJson<MonthlyReport>, ApiError> {
    let transactions = state.transactions.list(&username).await?;
    let report = MonthlyReport::generate(&transactions, year, month)?;
    Ok(ApiJson(report))
}
