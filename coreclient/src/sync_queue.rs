// SPDX-FileCopyrightText: 2025 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Ordered queue of local mutations waiting to be replayed against the server.
//!
//! Mutations of the same record are coalesced when they are enqueued:
//!
//! * An update of a record whose add is still queued rewrites the add.
//! * A newer update replaces an older queued update of the same record.
//! * A delete of a record whose add is still queued drops everything queued
//!   for the record, since the server never saw it. If the add was being
//!   replayed at that moment, completing it queues the delete after all.
//! * A delete drops queued updates and payments of the record.

use chrono::{DateTime, Utc};
use ledgercommon::{
    records::{Debt, Record, ResourceKind, Transaction},
    sync::{OperationKind, PaymentOperation, SyncOperation},
};
use sqlx::{SqliteConnection, SqliteExecutor, query, query_as, query_scalar};
use tracing::debug;

use crate::store::{StoreError, StoreResult};

/// A queued mutation of one of the synced record kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum PendingOperation {
    Transaction(SyncOperation<Transaction>),
    Debt(SyncOperation<Debt>),
    Payment(PaymentOperation),
}

impl PendingOperation {
    pub fn resource(&self) -> ResourceKind {
        match self {
            Self::Transaction(_) => ResourceKind::Transactions,
            Self::Debt(_) | Self::Payment(_) => ResourceKind::Debts,
        }
    }

    pub fn kind(&self) -> OperationKind {
        match self {
            Self::Transaction(operation) => operation.kind(),
            Self::Debt(operation) => operation.kind(),
            Self::Payment(_) => OperationKind::Payment,
        }
    }

    /// Id of the record the operation applies to.
    pub fn record_id(&self) -> String {
        match self {
            Self::Transaction(operation) => operation.id().to_string(),
            Self::Debt(operation) => operation.id().to_string(),
            Self::Payment(payment) => payment.debt_id.to_string(),
        }
    }
}

/// A row of the sync queue.
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedOperation {
    /// Position in the queue.
    pub seq: i64,
    pub(crate) revision: i64,
    pub operation: PendingOperation,
    pub created_at: DateTime<Utc>,
}

pub(crate) struct SyncQueue;

impl SyncQueue {
    pub(crate) async fn enqueue<R: Record>(
        connection: &mut SqliteConnection,
        operation: &SyncOperation<R>,
    ) -> StoreResult<()> {
        let resource = R::KIND.as_str();
        let record_id = operation.id().to_string();
        debug!(%resource, %record_id, kind = %operation.kind(), "Enqueueing operation");

        match operation {
            SyncOperation::Add(record) => {
                let payload = serde_json::to_string(record)?;
                insert(connection, resource, &record_id, OperationKind::Add, Some(&payload))
                    .await?;
            }
            SyncOperation::Update(record) => {
                let payload = serde_json::to_string(record)?;
                let rewritten = query(
                    "UPDATE sync_queue SET payload = ?1, revision = revision + 1
                    WHERE resource = ?2 AND record_id = ?3 AND operation = 'add'",
                )
                .bind(&payload)
                .bind(resource)
                .bind(&record_id)
                .execute(&mut *connection)
                .await?;
                if rewritten.rows_affected() > 0 {
                    return Ok(());
                }
                remove_for_record(&mut *connection, resource, &record_id, &["update"]).await?;
                insert(
                    connection,
                    resource,
                    &record_id,
                    OperationKind::Update,
                    Some(&payload),
                )
                .await?;
            }
            SyncOperation::Delete { .. } => {
                let add_pending = has_operation(
                    &mut *connection,
                    resource,
                    &record_id,
                    OperationKind::Add,
                )
                .await?;
                if add_pending {
                    let all = ["add", "update", "payment", "delete"];
                    remove_for_record(&mut *connection, resource, &record_id, &all).await?;
                    return Ok(());
                }
                remove_for_record(
                    &mut *connection,
                    resource,
                    &record_id,
                    &["update", "payment"],
                )
                .await?;
                let delete_pending = has_operation(
                    &mut *connection,
                    resource,
                    &record_id,
                    OperationKind::Delete,
                )
                .await?;
                if !delete_pending {
                    insert(connection, resource, &record_id, OperationKind::Delete, None).await?;
                }
            }
        }
        Ok(())
    }

    pub(crate) async fn enqueue_payment(
        executor: impl SqliteExecutor<'_>,
        payment: &PaymentOperation,
    ) -> StoreResult<()> {
        let record_id = payment.debt_id.to_string();
        debug!(%record_id, payment_id = %payment.payment.id, "Enqueueing payment");
        let payload = serde_json::to_string(&payment.payment)?;
        insert(
            executor,
            ResourceKind::Debts.as_str(),
            &record_id,
            OperationKind::Payment,
            Some(&payload),
        )
        .await
    }

    /// All queued operations in replay order.
    pub(crate) async fn load_all(
        executor: impl SqliteExecutor<'_>,
    ) -> StoreResult<Vec<QueuedOperation>> {
        let rows: Vec<QueueRow> = query_as(
            "SELECT seq, revision, resource, record_id, operation, payload, created_at
            FROM sync_queue ORDER BY seq ASC",
        )
        .fetch_all(executor)
        .await?;
        rows.into_iter().map(QueueRow::decode).collect()
    }

    /// The operation to replay next.
    pub(crate) async fn peek(
        executor: impl SqliteExecutor<'_>,
    ) -> StoreResult<Option<QueuedOperation>> {
        let row: Option<QueueRow> = query_as(
            "SELECT seq, revision, resource, record_id, operation, payload, created_at
            FROM sync_queue ORDER BY seq ASC LIMIT 1",
        )
        .fetch_optional(executor)
        .await?;
        row.map(QueueRow::decode).transpose()
    }

    /// Removes a replayed operation.
    ///
    /// If the operation was rewritten while it was replayed, it is kept. A
    /// rewritten add becomes an update, since the server knows the record now.
    /// An add whose record was deleted in the meantime leaves a delete behind
    /// for the same reason.
    pub(crate) async fn complete(
        connection: &mut SqliteConnection,
        queued: &QueuedOperation,
    ) -> StoreResult<()> {
        let removed = query("DELETE FROM sync_queue WHERE seq = ?1 AND revision = ?2")
            .bind(queued.seq)
            .bind(queued.revision)
            .execute(&mut *connection)
            .await?;
        if removed.rows_affected() > 0 || queued.operation.kind() != OperationKind::Add {
            return Ok(());
        }
        let rewritten =
            query("UPDATE sync_queue SET operation = 'update' WHERE seq = ?1 AND operation = 'add'")
                .bind(queued.seq)
                .execute(&mut *connection)
                .await?;
        if rewritten.rows_affected() > 0 {
            debug!(seq = queued.seq, "Add was rewritten during replay");
            return Ok(());
        }
        let resource = queued.operation.resource();
        let record_id = queued.operation.record_id();
        debug!(%resource, %record_id, "Record was deleted during replay of its add");
        let delete_pending = has_operation(
            &mut *connection,
            resource.as_str(),
            &record_id,
            OperationKind::Delete,
        )
        .await?;
        if !delete_pending {
            insert(
                connection,
                resource.as_str(),
                &record_id,
                OperationKind::Delete,
                None,
            )
            .await?;
        }
        Ok(())
    }

    /// Removes an operation regardless of its revision.
    pub(crate) async fn drop_operation(
        executor: impl SqliteExecutor<'_>,
        seq: i64,
    ) -> StoreResult<()> {
        query("DELETE FROM sync_queue WHERE seq = ?1")
            .bind(seq)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub(crate) async fn len(executor: impl SqliteExecutor<'_>) -> StoreResult<usize> {
        let count: i64 = query_scalar("SELECT COUNT(*) FROM sync_queue")
            .fetch_one(executor)
            .await?;
        Ok(usize::try_from(count).unwrap_or_default())
    }
}

async fn insert(
    executor: impl SqliteExecutor<'_>,
    resource: &str,
    record_id: &str,
    kind: OperationKind,
    payload: Option<&str>,
) -> StoreResult<()> {
    query(
        "INSERT INTO sync_queue (resource, record_id, operation, payload, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5)",
    )
    .bind(resource)
    .bind(record_id)
    .bind(kind.as_str())
    .bind(payload)
    .bind(Utc::now())
    .execute(executor)
    .await?;
    Ok(())
}

async fn has_operation(
    executor: impl SqliteExecutor<'_>,
    resource: &str,
    record_id: &str,
    kind: OperationKind,
) -> StoreResult<bool> {
    let exists = query_scalar(
        "SELECT EXISTS (
            SELECT 1 FROM sync_queue
            WHERE resource = ?1 AND record_id = ?2 AND operation = ?3
        )",
    )
    .bind(resource)
    .bind(record_id)
    .bind(kind.as_str())
    .fetch_one(executor)
    .await?;
    Ok(exists)
}

async fn remove_for_record(
    connection: &mut SqliteConnection,
    resource: &str,
    record_id: &str,
    kinds: &[&str],
) -> StoreResult<()> {
    for kind in kinds {
        query("DELETE FROM sync_queue WHERE resource = ?1 AND record_id = ?2 AND operation = ?3")
            .bind(resource)
            .bind(record_id)
            .bind(*kind)
            .execute(&mut *connection)
            .await?;
    }
    Ok(())
}

#[derive(sqlx::FromRow)]
struct QueueRow {
    seq: i64,
    revision: i64,
    resource: String,
    record_id: String,
    operation: String,
    payload: Option<String>,
    created_at: DateTime<Utc>,
}

impl QueueRow {
    fn decode(self) -> StoreResult<QueuedOperation> {
        let corrupted = |reason: String| StoreError::Corrupted {
            table: "sync_queue",
            reason,
        };
        let resource: ResourceKind = self
            .resource
            .parse()
            .map_err(|error| corrupted(format!("{error}")))?;
        let kind: OperationKind = self
            .operation
            .parse()
            .map_err(|error| corrupted(format!("{error}")))?;
        let operation = match (resource, kind) {
            (ResourceKind::Transactions, _) => {
                PendingOperation::Transaction(self.record_operation(kind)?)
            }
            (ResourceKind::Debts, OperationKind::Payment) => {
                let debt_id = self
                    .record_id
                    .parse()
                    .map_err(|error| corrupted(format!("invalid debt id: {error}")))?;
                let payload = self
                    .payload
                    .as_deref()
                    .ok_or_else(|| corrupted("payment without payload".into()))?;
                PendingOperation::Payment(PaymentOperation {
                    debt_id,
                    payment: serde_json::from_str(payload)?,
                })
            }
            (ResourceKind::Debts, _) => PendingOperation::Debt(self.record_operation(kind)?),
        };
        Ok(QueuedOperation {
            seq: self.seq,
            revision: self.revision,
            operation,
            created_at: self.created_at,
        })
    }

    fn record_operation<R: Record>(&self, kind: OperationKind) -> StoreResult<SyncOperation<R>> {
        let corrupted = |reason: String| StoreError::Corrupted {
            table: "sync_queue",
            reason,
        };
        let record = || -> StoreResult<R> {
            let payload = self
                .payload
                .as_deref()
                .ok_or_else(|| corrupted(format!("{kind} without payload")))?;
            Ok(serde_json::from_str(payload)?)
        };
        match kind {
            OperationKind::Add => Ok(SyncOperation::Add(record()?)),
            OperationKind::Update => Ok(SyncOperation::Update(record()?)),
            OperationKind::Delete => {
                let id = self
                    .record_id
                    .parse()
                    .map_err(|error| corrupted(format!("invalid record id: {error}")))?;
                Ok(SyncOperation::Delete { id })
            }
            OperationKind::Payment => Err(corrupted(format!(
                "payment on {}",
                R::KIND.record_name()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use ledgercommon::records::{DebtKind, NewPayment, TransactionKind};
    use rust_decimal_macros::dec;

    use crate::store::LocalStore;

    use super::*;

    fn transaction(reason: &str) -> Transaction {
        Transaction {
            id: ledgercommon::identifiers::Identifier::random(),
            kind: TransactionKind::Income,
            amount: dec!(100),
            date: Utc::now(),
            reason: reason.into(),
            category: "Work".into(),
            account_name: None,
        }
    }

    async fn enqueue<R: Record>(store: &LocalStore, operation: SyncOperation<R>) {
        let mut connection = store.pool().acquire().await.unwrap();
        SyncQueue::enqueue(&mut connection, &operation).await.unwrap();
    }

    async fn operations(store: &LocalStore) -> Vec<PendingOperation> {
        SyncQueue::load_all(store.pool())
            .await
            .unwrap()
            .into_iter()
            .map(|queued| queued.operation)
            .collect()
    }

    #[tokio::test]
    async fn operations_keep_their_order() {
        let store = LocalStore::in_memory().await.unwrap();
        let first = transaction("Salary");
        let debt = Debt::new(DebtKind::Debt, dec!(40), "Hank", "Groceries");
        let payment = PaymentOperation {
            debt_id: debt.id,
            payment: NewPayment::new(dec!(10)),
        };

        enqueue(&store, SyncOperation::Add(first.clone())).await;
        enqueue(&store, SyncOperation::Add(debt.clone())).await;
        SyncQueue::enqueue_payment(store.pool(), &payment)
            .await
            .unwrap();

        assert_eq!(
            operations(&store).await,
            vec![
                PendingOperation::Transaction(SyncOperation::Add(first)),
                PendingOperation::Debt(SyncOperation::Add(debt)),
                PendingOperation::Payment(payment),
            ]
        );
        assert_eq!(SyncQueue::len(store.pool()).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn update_rewrites_pending_add() {
        let store = LocalStore::in_memory().await.unwrap();
        let mut record = transaction("Salary");
        enqueue(&store, SyncOperation::Add(record.clone())).await;
        let other = transaction("Bonus");
        enqueue(&store, SyncOperation::Add(other.clone())).await;

        record.amount = dec!(120);
        enqueue(&store, SyncOperation::Update(record.clone())).await;

        assert_eq!(
            operations(&store).await,
            vec![
                PendingOperation::Transaction(SyncOperation::Add(record)),
                PendingOperation::Transaction(SyncOperation::Add(other)),
            ]
        );
    }

    #[tokio::test]
    async fn newer_update_replaces_older_one() {
        let store = LocalStore::in_memory().await.unwrap();
        let mut record = transaction("Salary");
        enqueue(&store, SyncOperation::Update(record.clone())).await;
        record.reason = "Salary March".into();
        enqueue(&store, SyncOperation::Update(record.clone())).await;

        assert_eq!(
            operations(&store).await,
            vec![PendingOperation::Transaction(SyncOperation::Update(record))]
        );
    }

    #[tokio::test]
    async fn delete_of_unsynced_record_leaves_nothing() {
        let store = LocalStore::in_memory().await.unwrap();
        let debt = Debt::new(DebtKind::Debtor, dec!(60), "Ivan", "Tickets");
        enqueue(&store, SyncOperation::Add(debt.clone())).await;
        SyncQueue::enqueue_payment(
            store.pool(),
            &PaymentOperation {
                debt_id: debt.id,
                payment: NewPayment::new(dec!(20)),
            },
        )
        .await
        .unwrap();

        enqueue(&store, SyncOperation::<Debt>::Delete { id: debt.id }).await;

        assert!(operations(&store).await.is_empty());
    }

    #[tokio::test]
    async fn delete_replaces_updates_and_payments_once() {
        let store = LocalStore::in_memory().await.unwrap();
        let debt = Debt::new(DebtKind::Debtor, dec!(60), "Ivan", "Tickets");
        let other = transaction("Salary");
        enqueue(&store, SyncOperation::Update(debt.clone())).await;
        enqueue(&store, SyncOperation::Add(other.clone())).await;
        SyncQueue::enqueue_payment(
            store.pool(),
            &PaymentOperation {
                debt_id: debt.id,
                payment: NewPayment::new(dec!(20)),
            },
        )
        .await
        .unwrap();

        enqueue(&store, SyncOperation::<Debt>::Delete { id: debt.id }).await;
        enqueue(&store, SyncOperation::<Debt>::Delete { id: debt.id }).await;

        assert_eq!(
            operations(&store).await,
            vec![
                PendingOperation::Transaction(SyncOperation::Add(other)),
                PendingOperation::Debt(SyncOperation::Delete { id: debt.id }),
            ]
        );
    }

    #[tokio::test]
    async fn add_rewritten_during_replay_becomes_update() {
        let store = LocalStore::in_memory().await.unwrap();
        let mut record = transaction("Salary");
        enqueue(&store, SyncOperation::Add(record.clone())).await;

        let in_flight = SyncQueue::peek(store.pool()).await.unwrap().unwrap();
        record.amount = dec!(150);
        enqueue(&store, SyncOperation::Update(record.clone())).await;

        let mut connection = store.pool().acquire().await.unwrap();
        SyncQueue::complete(&mut connection, &in_flight)
            .await
            .unwrap();
        drop(connection);

        assert_eq!(
            operations(&store).await,
            vec![PendingOperation::Transaction(SyncOperation::Update(
                record
            ))]
        );

        let replayed = SyncQueue::peek(store.pool()).await.unwrap().unwrap();
        let mut connection = store.pool().acquire().await.unwrap();
        SyncQueue::complete(&mut connection, &replayed)
            .await
            .unwrap();
        drop(connection);
        assert_eq!(SyncQueue::len(store.pool()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn add_deleted_during_replay_leaves_a_delete() {
        let store = LocalStore::in_memory().await.unwrap();
        let debt = Debt::new(DebtKind::Debt, dec!(80), "Kim", "Concert");
        let other = transaction("Salary");
        enqueue(&store, SyncOperation::Add(debt.clone())).await;
        enqueue(&store, SyncOperation::Add(other.clone())).await;

        let in_flight = SyncQueue::peek(store.pool()).await.unwrap().unwrap();
        enqueue(&store, SyncOperation::<Debt>::Delete { id: debt.id }).await;
        assert_eq!(
            operations(&store).await,
            vec![PendingOperation::Transaction(SyncOperation::Add(
                other.clone()
            ))]
        );

        // The server got the debt, so it has to be deleted there too.
        let mut connection = store.pool().acquire().await.unwrap();
        SyncQueue::complete(&mut connection, &in_flight)
            .await
            .unwrap();
        drop(connection);

        assert_eq!(
            operations(&store).await,
            vec![
                PendingOperation::Transaction(SyncOperation::Add(other)),
                PendingOperation::Debt(SyncOperation::Delete { id: debt.id }),
            ]
        );
    }
}
