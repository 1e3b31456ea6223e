// SPDX-FileCopyrightText: 2025 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use async_trait::async_trait;
use ledgerapiclient::{ApiClient, ApiRequestError};
use ledgercommon::{
    identifiers::{DebtId, TransactionId},
    records::{Debt, NewPayment, Transaction},
};

/// The server endpoints the sync queue is replayed against.
#[async_trait]
pub trait RemoteLedger: Send + Sync + 'static {
    async fn list_transactions(&self) -> Result<Vec<Transaction>, ApiRequestError>;

    async fn create_transaction(&self, transaction: &Transaction) -> Result<(), ApiRequestError>;

    async fn update_transaction(&self, transaction: &Transaction) -> Result<(), ApiRequestError>;

    async fn delete_transaction(&self, id: TransactionId) -> Result<(), ApiRequestError>;

    async fn list_debts(&self) -> Result<Vec<Debt>, ApiRequestError>;

    async fn create_debt(&self, debt: &Debt) -> Result<(), ApiRequestError>;

    async fn update_debt(&self, debt: &Debt) -> Result<(), ApiRequestError>;

    async fn delete_debt(&self, id: DebtId) -> Result<(), ApiRequestError>;

    async fn add_payment(&self, debt_id: DebtId, payment: &NewPayment)
    -> Result<(), ApiRequestError>;
}

#[async_trait]
impl RemoteLedger for ApiClient {
    async fn list_transactions(&self) -> Result<Vec<Transaction>, ApiRequestError> {
        ApiClient::list_transactions(self).await
    }

    async fn create_transaction(&self, transaction: &Transaction) -> Result<(), ApiRequestError> {
        ApiClient::create_transaction(self, transaction).await?;
        Ok(())
    }

    async fn update_transaction(&self, transaction: &Transaction) -> Result<(), ApiRequestError> {
        ApiClient::update_transaction(self, transaction).await?;
        Ok(())
    }

    async fn delete_transaction(&self, id: TransactionId) -> Result<(), ApiRequestError> {
        ApiClient::delete_transaction(self, id).await
    }

    async fn list_debts(&self) -> Result<Vec<Debt>, ApiRequestError> {
        ApiClient::list_debts(self).await
    }

    async fn create_debt(&self, debt: &Debt) -> Result<(), ApiRequestError> {
        ApiClient::create_debt(self, debt).await?;
        Ok(())
    }

    async fn update_debt(&self, debt: &Debt) -> Result<(), ApiRequestError> {
        ApiClient::update_debt(self, debt).await?;
        Ok(())
    }

    async fn delete_debt(&self, id: DebtId) -> Result<(), ApiRequestError> {
        ApiClient::delete_debt(self, id).await
    }

    async fn add_payment(
        &self,
        debt_id: DebtId,
        payment: &NewPayment,
    ) -> Result<(), ApiRequestError> {
        ApiClient::add_payment(self, debt_id, payment).await?;
        Ok(())
    }
}
