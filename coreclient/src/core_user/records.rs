// SPDX-FileCopyrightText: 2025 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Local mutations of transactions and debts.
//!
//! Every mutation is applied to the local cache and queued for the server in
//! the same database transaction.

use ledgercommon::{
    identifiers::{DebtId, Identifier, TransactionId},
    records::{Debt, NewPayment, Record, Transaction},
    report::MonthlyReport,
    summary::{DebtSummary, TransactionSummary},
    sync::{PaymentOperation, SyncOperation},
};
use tracing::debug;

use crate::{
    error::RecordNotFound,
    store::{StoreError, records},
    sync_queue::SyncQueue,
};

use super::CoreUser;

impl CoreUser {
    /// All transactions, most recent first.
    pub async fn transactions(&self) -> anyhow::Result<Vec<Transaction>> {
        Ok(records::load_all(self.store().pool()).await?)
    }

    pub async fn add_transaction(&self, transaction: Transaction) -> anyhow::Result<Transaction> {
        self.add_record(transaction).await
    }

    pub async fn update_transaction(
        &self,
        transaction: Transaction,
    ) -> anyhow::Result<Transaction> {
        self.update_record(transaction).await
    }

    pub async fn delete_transaction(&self, id: TransactionId) -> anyhow::Result<()> {
        self.delete_record::<Transaction>(id).await
    }

    pub async fn transaction_summary(&self) -> anyhow::Result<TransactionSummary> {
        let transactions = self.transactions().await?;
        Ok(TransactionSummary::from_transactions(&transactions))
    }

    /// Report of a month, computed from the local transactions.
    pub async fn monthly_report(&self, year: i32, month: u32) -> anyhow::Result<MonthlyReport> {
        let transactions = self.transactions().await?;
        Ok(MonthlyReport::generate(&transactions, year, month)?)
    }

    /// All debts and debtors, most recent first.
    pub async fn debts(&self) -> anyhow::Result<Vec<Debt>> {
        Ok(records::load_all(self.store().pool()).await?)
    }

    /// Adds a debt. Its paid amount and status are derived from its payments.
    pub async fn add_debt(&self, mut debt: Debt) -> anyhow::Result<Debt> {
        debt.recompute();
        self.add_record(debt).await
    }

    /// Updates a debt. The recorded payments are kept.
    pub async fn update_debt(&self, debt: Debt) -> anyhow::Result<Debt> {
        self.update_record(debt).await
    }

    pub async fn delete_debt(&self, id: DebtId) -> anyhow::Result<()> {
        self.delete_record::<Debt>(id).await
    }

    /// Records a partial payment of a debt and returns the updated debt.
    ///
    /// The payment must be positive and must not exceed what is left to pay.
    pub async fn record_payment(&self, debt_id: DebtId, payment: NewPayment) -> anyhow::Result<Debt> {
        let debt = self
            .store()
            .with_transaction(async |txn| {
                let mut debt = records::load::<Debt>(txn.as_mut(), debt_id)
                    .await?
                    .ok_or(RecordNotFound(Debt::KIND.record_name()))?;
                payment.validate(&debt)?;
                let payment = payment.clone().into_payment();
                debt.apply_payment(payment.clone())?;
                records::upsert(txn.as_mut(), &debt).await?;
                let operation = PaymentOperation {
                    debt_id,
                    payment: payment.into(),
                };
                SyncQueue::enqueue_payment(txn.as_mut(), &operation).await?;
                Ok::<_, anyhow::Error>(debt)
            })
            .await?;
        debug!(%debt_id, paid = %debt.paid_amount, "Recorded payment");
        self.request_sync();
        Ok(debt)
    }

    pub async fn debt_summary(&self) -> anyhow::Result<DebtSummary> {
        let debts = self.debts().await?;
        Ok(DebtSummary::from_debts(&debts))
    }

    async fn add_record<R: Record>(&self, mut record: R) -> anyhow::Result<R> {
        record.validate()?;
        if record.id().is_nil() {
            record.set_id(R::Id::random());
        }
        self.store()
            .with_transaction(async |txn| {
                records::upsert(txn.as_mut(), &record).await?;
                SyncQueue::enqueue(txn.as_mut(), &SyncOperation::Add(record.clone())).await?;
                Ok::<_, StoreError>(())
            })
            .await?;
        debug!(kind = %R::KIND, id = %record.id(), "Added record");
        self.request_sync();
        Ok(record)
    }

    async fn update_record<R: Record>(&self, record: R) -> anyhow::Result<R> {
        record.validate()?;
        let id = record.id();
        let updated = self
            .store()
            .with_transaction(async |txn| {
                let stored = records::load::<R>(txn.as_mut(), id)
                    .await?
                    .ok_or(RecordNotFound(R::KIND.record_name()))?;
                let updated = stored.merge_update(record.clone());
                records::upsert(txn.as_mut(), &updated).await?;
                SyncQueue::enqueue(txn.as_mut(), &SyncOperation::Update(updated.clone())).await?;
                Ok::<_, anyhow::Error>(updated)
            })
            .await?;
        debug!(kind = %R::KIND, %id, "Updated record");
        self.request_sync();
        Ok(updated)
    }

    async fn delete_record<R: Record>(&self, id: R::Id) -> anyhow::Result<()> {
        self.store()
            .with_transaction(async |txn| {
                if !records::delete::<R>(txn.as_mut(), id).await? {
                    return Err(RecordNotFound(R::KIND.record_name()).into());
                }
                SyncQueue::enqueue(txn.as_mut(), &SyncOperation::<R>::Delete { id }).await?;
                Ok::<_, anyhow::Error>(())
            })
            .await?;
        debug!(kind = %R::KIND, %id, "Deleted record");
        self.request_sync();
        Ok(())
    }
}
