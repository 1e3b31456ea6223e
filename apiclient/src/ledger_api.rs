// SPDX-FileCopyrightText: 2025 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! API client implementation for the per-user records

use ledgercommon::{
    identifiers::{DebtId, TransactionId},
    messages::{MonthlyReportQuery, SummaryResponse},
    records::{Debt, NewPayment, Record, Transaction},
    report::MonthlyReport,
};
use reqwest::Method;

use crate::{ApiClient, ApiRequestError};

impl ApiClient {
    /// Fetches all records of the logged in user.
    pub async fn list_records<R: Record>(&self) -> Result<Vec<R>, ApiRequestError> {
        let request = self.request(Method::GET, R::KIND.api_path())?;
        self.send_json(request).await
    }

    /// Creates a record. Creating a record whose id already exists returns the
    /// stored record unchanged.
    pub async fn create_record<R: Record>(&self, record: &R) -> Result<R, ApiRequestError> {
        let request = self
            .request(Method::POST, R::KIND.api_path())?
            .json(record);
        self.send_json(request).await
    }

    pub async fn update_record<R: Record>(&self, record: &R) -> Result<R, ApiRequestError> {
        let path = record_path::<R>(record.id());
        let request = self.request(Method::PUT, &path)?.json(record);
        self.send_json(request).await
    }

    pub async fn delete_record<R: Record>(&self, id: R::Id) -> Result<(), ApiRequestError> {
        let request = self.request(Method::DELETE, &record_path::<R>(id))?;
        self.send_empty(request).await
    }

    pub async fn list_transactions(&self) -> Result<Vec<Transaction>, ApiRequestError> {
        self.list_records().await
    }

    pub async fn create_transaction(
        &self,
        transaction: &Transaction,
    ) -> Result<Transaction, ApiRequestError> {
        self.create_record(transaction).await
    }

    pub async fn update_transaction(
        &self,
        transaction: &Transaction,
    ) -> Result<Transaction, ApiRequestError> {
        self.update_record(transaction).await
    }

    pub async fn delete_transaction(&self, id: TransactionId) -> Result<(), ApiRequestError> {
        self.delete_record::<Transaction>(id).await
    }

    pub async fn list_debts(&self) -> Result<Vec<Debt>, ApiRequestError> {
        self.list_records().await
    }

    pub async fn create_debt(&self, debt: &Debt) -> Result<Debt, ApiRequestError> {
        self.create_record(debt).await
    }

    pub async fn update_debt(&self, debt: &Debt) -> Result<Debt, ApiRequestError> {
        self.update_record(debt).await
    }

    pub async fn delete_debt(&self, id: DebtId) -> Result<(), ApiRequestError> {
        self.delete_record::<Debt>(id).await
    }

    /// Records a partial payment and returns the updated debt.
    pub async fn add_payment(
        &self,
        debt_id: DebtId,
        payment: &NewPayment,
    ) -> Result<Debt, ApiRequestError> {
        let path = format!("{}/payments", record_path::<Debt>(debt_id));
        let request = self.request(Method::POST, &path)?.json(payment);
        self.send_json(request).await
    }

    pub async fn summary(&self) -> Result<SummaryResponse, ApiRequestError> {
        let request = self.request(Method::GET, "/api/summary")?;
        self.send_json(request).await
    }

    pub async fn monthly_report(
        &self,
        year: i32,
        month: u32,
    ) -> Result<MonthlyReport, ApiRequestError> {
        let request = self
            .request(Method::GET, "/api/reports/monthly")?
            .query(&MonthlyReportQuery { year, month });
        self.send_json(request).await
    }
}

fn record_path<R: Record>(id: R::Id) -> String {
    format!("{}/{id}", R::KIND.api_path())
}
