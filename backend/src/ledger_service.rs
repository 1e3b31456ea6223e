// SPDX-FileCopyrightText: 2025 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Per-user record lists.
//!
//! All records of one kind that belong to a user are stored as a single JSON
//! array under the key `{kind}_{username}`. Every read-modify-write of such a
//! blob holds the lock of its key.

use std::{marker::PhantomData, sync::Arc};

use ledgercommon::{
    identifiers::Identifier,
    records::{Debt, NewPayment, Record},
};
use tracing::{debug, info};

use crate::{
    blob_store::{BlobStore, load_list, store_list},
    errors::{ResourceError, StorageError},
    key_lock::KeyLocks,
};

/// Result of creating a record.
#[derive(Debug, Clone, PartialEq)]
pub struct Created<R> {
    pub record: R,
    /// `false` if a record with the same id was already stored. In that case
    /// `record` is the stored one.
    pub created: bool,
}

#[derive(Debug)]
pub struct ResourceService<R> {
    blobs: Arc<dyn BlobStore>,
    locks: KeyLocks,
    _record: PhantomData<fn() -> R>,
}

impl<R> Clone for ResourceService<R> {
    fn clone(&self) -> Self {
        Self {
            blobs: self.blobs.clone(),
            locks: self.locks.clone(),
            _record: PhantomData,
        }
    }
}

impl<R: Record> ResourceService<R> {
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            blobs,
            locks: KeyLocks::default(),
            _record: PhantomData,
        }
    }

    fn not_found() -> ResourceError {
        ResourceError::NotFound(R::KIND.record_name())
    }

    async fn load(&self, key: &str) -> Result<Option<Vec<R>>, StorageError> {
        load_list(self.blobs.as_ref(), R::KIND.store_name(), key).await
    }

    async fn store(&self, key: &str, records: &[R]) -> Result<(), StorageError> {
        store_list(self.blobs.as_ref(), R::KIND.store_name(), key, records).await
    }

    /// All records of the user in stored order.
    ///
    /// Initializes the list of a user that has none yet.
    pub async fn list(&self, username: &str) -> Result<Vec<R>, ResourceError> {
        let key = R::KIND.blob_key(username);
        let _guard = self.locks.lock(&key).await;
        match self.load(&key).await? {
            Some(records) => Ok(records),
            None => {
                debug!(%key, "Initializing empty record list");
                self.store(&key, &[]).await?;
                Ok(Vec::new())
            }
        }
    }

    pub async fn get(&self, username: &str, id: R::Id) -> Result<R, ResourceError> {
        let key = R::KIND.blob_key(username);
        let _guard = self.locks.lock(&key).await;
        self.load(&key)
            .await?
            .unwrap_or_default()
            .into_iter()
            .find(|record| record.id() == id)
            .ok_or_else(Self::not_found)
    }

    /// Appends a record to the user's list.
    ///
    /// A record without id is assigned a fresh one. Creating a record whose id
    /// is already taken leaves the list untouched.
    pub async fn create(&self, username: &str, mut record: R) -> Result<Created<R>, ResourceError> {
        record.validate()?;
        if record.id().is_nil() {
            record.set_id(R::Id::random());
        }

        let key = R::KIND.blob_key(username);
        let _guard = self.locks.lock(&key).await;
        let mut records = self.load(&key).await?.unwrap_or_default();
        if let Some(existing) = records.iter().find(|r| r.id() == record.id()) {
            debug!(%key, id = %record.id(), "Record already exists");
            return Ok(Created {
                record: existing.clone(),
                created: false,
            });
        }
        records.push(record.clone());
        self.store(&key, &records).await?;
        metrics::counter!("ledger_records_created_total", "kind" => R::KIND.as_str()).increment(1);
        Ok(Created {
            record,
            created: true,
        })
    }

    /// Writes `record` over the stored record with the given id.
    ///
    /// The id in the path wins over the id in the body.
    pub async fn update(&self, username: &str, id: R::Id, mut record: R) -> Result<R, ResourceError> {
        record.validate()?;
        record.set_id(id);

        let key = R::KIND.blob_key(username);
        let _guard = self.locks.lock(&key).await;
        let mut records = self.load(&key).await?.unwrap_or_default();
        let stored = records
            .iter_mut()
            .find(|r| r.id() == id)
            .ok_or_else(Self::not_found)?;
        *stored = stored.merge_update(record);
        let updated = stored.clone();
        self.store(&key, &records).await?;
        Ok(updated)
    }

    /// Removes the record with the given id and returns it.
    pub async fn delete(&self, username: &str, id: R::Id) -> Result<R, ResourceError> {
        let key = R::KIND.blob_key(username);
        let _guard = self.locks.lock(&key).await;
        let mut records = self.load(&key).await?.unwrap_or_default();
        let index = records
            .iter()
            .position(|r| r.id() == id)
            .ok_or_else(Self::not_found)?;
        let removed = records.remove(index);
        self.store(&key, &records).await?;
        Ok(removed)
    }

    /// Number of users that have a list of this kind.
    pub async fn owner_count(&self) -> Result<usize, StorageError> {
        Ok(self.blobs.list_keys(R::KIND.store_name()).await?.len())
    }
}

impl ResourceService<Debt> {
    /// Records a partial payment of a debt and returns the updated debt.
    ///
    /// A payment whose id is already recorded is not applied again.
    pub async fn add_payment(
        &self,
        username: &str,
        debt_id: <Debt as Record>::Id,
        payment: NewPayment,
    ) -> Result<Debt, ResourceError> {
        let key = Debt::KIND.blob_key(username);
        let _guard = self.locks.lock(&key).await;
        let mut debts = self.load(&key).await?.unwrap_or_default();
        let debt = debts
            .iter_mut()
            .find(|d| d.id == debt_id)
            .ok_or_else(Self::not_found)?;
        if !debt.apply_payment(payment.into_payment())? {
            debug!(%key, %debt_id, "Payment already recorded");
            return Ok(debt.clone());
        }
        let updated = debt.clone();
        self.store(&key, &debts).await?;
        if updated.is_paid() {
            info!(%debt_id, "Debt paid off");
        }
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use ledgercommon::{
        assert_matches,
        identifiers::TransactionId,
        records::{DebtKind, DebtStatus, Transaction, TransactionKind},
        validation::ValidationError,
    };
    use rust_decimal_macros::dec;

    use crate::{blob_store::MemoryBlobStore, init_test_tracing};

    use super::*;

    fn services() -> (
        Arc<MemoryBlobStore>,
        ResourceService<Transaction>,
        ResourceService<Debt>,
    ) {
        init_test_tracing();
        let blobs = Arc::new(MemoryBlobStore::default());
        (
            blobs.clone(),
            ResourceService::new(blobs.clone()),
            ResourceService::new(blobs),
        )
    }

    fn coffee() -> Transaction {
        Transaction {
            id: TransactionId::default(),
            kind: TransactionKind::Expense,
            amount: dec!(3.5),
            date: Utc::now(),
            reason: "Coffee".into(),
            category: "Food".into(),
            account_name: None,
        }
    }

    #[tokio::test]
    async fn list_initializes_missing_blob() -> anyhow::Result<()> {
        let (blobs, transactions, _) = services();
        assert!(transactions.list("ada").await?.is_empty());
        assert_eq!(
            blobs
                .get_json("transactions_store", "transactions_ada")
                .await?,
            Some(serde_json::json!([]))
        );
        Ok(())
    }

    #[tokio::test]
    async fn create_assigns_id_and_is_idempotent() -> anyhow::Result<()> {
        let (_, transactions, _) = services();

        let first = transactions.create("ada", coffee()).await?;
        assert!(first.created);
        assert!(!first.record.id.is_nil());

        let mut replay = coffee();
        replay.id = first.record.id;
        replay.amount = dec!(99);
        let second = transactions.create("ada", replay).await?;
        assert!(!second.created);
        assert_eq!(second.record, first.record);

        assert_eq!(transactions.list("ada").await?, vec![first.record]);
        assert!(transactions.list("bob").await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn invalid_records_are_rejected() {
        let (_, transactions, _) = services();
        let mut record = coffee();
        record.amount = dec!(-1);
        assert_matches!(
            transactions.create("ada", record).await,
            Err(ResourceError::Invalid(ValidationError::NonPositiveAmount))
        );
    }

    #[tokio::test]
    async fn update_and_delete() -> anyhow::Result<()> {
        let (_, transactions, _) = services();
        let created = transactions.create("ada", coffee()).await?.record;

        let mut edit = coffee();
        edit.reason = "Coffee and cake".into();
        let updated = transactions.update("ada", created.id, edit).await?;
        assert_eq!(updated.id, created.id);
        assert_eq!(
            transactions.get("ada", created.id).await?.reason,
            "Coffee and cake"
        );

        assert_matches!(
            transactions
                .update("ada", TransactionId::random(), coffee())
                .await,
            Err(ResourceError::NotFound("Transaction"))
        );
        assert_matches!(
            transactions.update("bob", created.id, coffee()).await,
            Err(ResourceError::NotFound(_))
        );

        transactions.delete("ada", created.id).await?;
        assert_matches!(
            transactions.delete("ada", created.id).await,
            Err(ResourceError::NotFound(_))
        );
        assert!(transactions.list("ada").await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn payments() -> anyhow::Result<()> {
        let (_, _, debts) = services();
        let debt = Debt::new(DebtKind::Debt, dec!(60), "Bob", "Bike repair");
        let debt = debts.create("ada", debt).await?.record;

        let payment = NewPayment::new(dec!(20));
        let after_first = debts.add_payment("ada", debt.id, payment.clone()).await?;
        assert_eq!(after_first.paid_amount, dec!(20));

        let replayed = debts.add_payment("ada", debt.id, payment).await?;
        assert_eq!(replayed.payments.len(), 1);

        assert_matches!(
            debts
                .add_payment("ada", debt.id, NewPayment::new(dec!(41)))
                .await,
            Err(ResourceError::Invalid(ValidationError::ExceedsRemaining { .. }))
        );

        let paid = debts
            .add_payment("ada", debt.id, NewPayment::new(dec!(40)))
            .await?;
        assert_eq!(paid.status, DebtStatus::Paid);
        assert_eq!(debts.get("ada", debt.id).await?, paid);

        // Editing the debt keeps its payment history.
        let mut edit = paid.clone();
        edit.payments.clear();
        edit.reason = "Bike repair and lock".into();
        let edited = debts.update("ada", debt.id, edit).await?;
        assert_eq!(edited.payments.len(), 2);
        assert_eq!(edited.paid_amount, dec!(60));

        assert_matches!(
            debts
                .add_payment("ada", Identifier::random(), NewPayment::new(dec!(1)))
                .await,
            Err(ResourceError::NotFound("Debt record"))
        );
        Ok(())
    }

    #[tokio::test]
    async fn concurrent_creates_are_not_lost() -> anyhow::Result<()> {
        let (_, transactions, _) = services();
        let tasks: Vec<_> = (0..20)
            .map(|_| {
                let transactions = transactions.clone();
                tokio::spawn(async move { transactions.create("ada", coffee()).await })
            })
            .collect();
        for task in tasks {
            task.await??;
        }
        assert_eq!(transactions.list("ada").await?.len(), 20);
        assert_eq!(transactions.owner_count().await?, 1);
        Ok(())
    }
}
