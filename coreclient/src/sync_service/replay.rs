// SPDX-FileCopyrightText: 2025 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Replays the sync queue and refetches the authoritative server state.

use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use chrono::{DateTime, Utc};
use ledgerapiclient::ApiRequestError;
use ledgercommon::{
    records::{Debt, Transaction},
    sync::{OperationKind, SyncOperation},
};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    error::SyncError,
    remote::RemoteLedger,
    store::{LocalStore, StoreResult, records},
    sync_queue::{PendingOperation, QueuedOperation, SyncQueue},
};

/// Outcome of one pass over the sync queue.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Operations the server accepted.
    pub synced: usize,
    /// Operations the server refused for good. They were dropped.
    pub rejected: usize,
    /// Operations still waiting in the queue.
    pub remaining: usize,
    /// Whether the local cache was overwritten with the server state.
    pub refreshed: bool,
    /// The first error, if any.
    pub error: Option<String>,
}

impl SyncReport {
    pub fn is_complete(&self) -> bool {
        self.remaining == 0 && self.refreshed && self.error.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStatus {
    pub online: bool,
    pub syncing: bool,
    /// Number of queued operations.
    pub pending: usize,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

#[derive(Debug, Default)]
struct SyncState {
    online: AtomicBool,
    /// Held while the queue is replayed.
    syncing: tokio::sync::Mutex<()>,
    last_synced_at: Mutex<Option<DateTime<Utc>>>,
    last_error: Mutex<Option<String>>,
}

#[derive(Clone)]
pub(crate) struct SyncContext {
    store: LocalStore,
    remote: Arc<dyn RemoteLedger>,
    state: Arc<SyncState>,
}

impl fmt::Debug for SyncContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncContext")
            .field("store", &self.store)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl SyncContext {
    pub(crate) fn new(store: LocalStore, remote: Arc<dyn RemoteLedger>, online: bool) -> Self {
        let state = SyncState {
            online: AtomicBool::new(online),
            ..Default::default()
        };
        Self {
            store,
            remote,
            state: Arc::new(state),
        }
    }

    pub(crate) fn is_online(&self) -> bool {
        self.state.online.load(Ordering::SeqCst)
    }

    pub(crate) fn set_online(&self, online: bool) {
        self.state.online.store(online, Ordering::SeqCst);
    }

    /// Holds off syncing until the guard is dropped. A running sync is
    /// waited for.
    pub(crate) async fn pause(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.state.syncing.lock().await
    }

    /// One background run. Errors are logged; they are also kept in the
    /// sync status.
    pub(super) async fn work(&self, run_token: CancellationToken) -> Option<SyncReport> {
        match self.process_sync_queue(&run_token).await {
            Ok(Some(report)) => {
                if report.is_complete() {
                    info!(synced = report.synced, "All changes are synced");
                } else {
                    warn!(?report, "Sync finished with pending changes");
                }
                Some(report)
            }
            Ok(None) => {
                debug!("Nothing to sync");
                None
            }
            Err(error) => {
                error!(%error, "Failed to process sync queue");
                *self.state.last_error.lock() = Some(error.to_string());
                None
            }
        }
    }

    /// Replays the queued operations in order and refetches the server state.
    ///
    /// Returns `None` without doing anything when offline, when another sync
    /// is running or when the queue is empty. Replay stops at the first
    /// failure; the failed operation and everything after it stay queued
    /// unless the server rejected the operation for good. The local cache is
    /// refetched in any case.
    pub(crate) async fn process_sync_queue(
        &self,
        run_token: &CancellationToken,
    ) -> Result<Option<SyncReport>, SyncError> {
        if !self.is_online() {
            debug!("Offline; not syncing");
            return Ok(None);
        }
        let Ok(_syncing) = self.state.syncing.try_lock() else {
            debug!("Sync already running");
            return Ok(None);
        };
        let pool = self.store.pool();
        if SyncQueue::len(pool).await? == 0 {
            return Ok(None);
        }

        let mut report = SyncReport::default();
        loop {
            if run_token.is_cancelled() {
                debug!("Sync cancelled");
                break;
            }
            let Some(queued) = SyncQueue::peek(pool).await? else {
                break;
            };
            debug!(
                seq = queued.seq,
                resource = %queued.operation.resource(),
                kind = %queued.operation.kind(),
                "Replaying operation"
            );
            match self.replay(&queued.operation).await {
                Ok(()) => {
                    let mut connection = pool.acquire().await?;
                    SyncQueue::complete(&mut connection, &queued).await?;
                    report.synced += 1;
                }
                Err(error) => {
                    let error = SyncError::from(error);
                    if error.is_rejection() {
                        error!(%error, seq = queued.seq, "Server rejected operation; dropping");
                        SyncQueue::drop_operation(pool, queued.seq).await?;
                        report.rejected += 1;
                    } else {
                        warn!(%error, seq = queued.seq, "Failed to replay operation; will retry later");
                    }
                    report.error = Some(error.to_string());
                    break;
                }
            }
        }

        match self.refresh().await {
            Ok(()) => report.refreshed = true,
            Err(error) => {
                warn!(%error, "Failed to refetch server state");
                report.error.get_or_insert_with(|| error.to_string());
            }
        }
        report.remaining = SyncQueue::len(pool).await?;
        self.record(&report);
        Ok(Some(report))
    }

    async fn replay(&self, operation: &PendingOperation) -> Result<(), ApiRequestError> {
        let remote = self.remote.as_ref();
        let result = match operation {
            PendingOperation::Transaction(SyncOperation::Add(transaction)) => {
                remote.create_transaction(transaction).await
            }
            PendingOperation::Transaction(SyncOperation::Update(transaction)) => {
                remote.update_transaction(transaction).await
            }
            PendingOperation::Transaction(SyncOperation::Delete { id }) => {
                remote.delete_transaction(*id).await
            }
            PendingOperation::Debt(SyncOperation::Add(debt)) => remote.create_debt(debt).await,
            PendingOperation::Debt(SyncOperation::Update(debt)) => remote.update_debt(debt).await,
            PendingOperation::Debt(SyncOperation::Delete { id }) => remote.delete_debt(*id).await,
            PendingOperation::Payment(payment) => {
                remote.add_payment(payment.debt_id, &payment.payment).await
            }
        };
        match result {
            Err(error) if operation.kind() == OperationKind::Delete && error.is_not_found() => {
                debug!("Record was already deleted on the server");
                Ok(())
            }
            result => result,
        }
    }

    /// Overwrites the local cache with the server state.
    ///
    /// Operations which are still queued are applied on top, so local changes
    /// stay visible until they are synced.
    pub(crate) async fn refresh(&self) -> Result<(), SyncError> {
        let transactions = self.remote.list_transactions().await?;
        let debts = self.remote.list_debts().await?;
        self.store
            .with_transaction(async |txn| {
                let pending = SyncQueue::load_all(txn.as_mut()).await?;
                let mut transactions = transactions.clone();
                let mut debts = debts.clone();
                apply_pending(&mut transactions, &mut debts, &pending);
                records::replace_all(txn.as_mut(), &transactions).await?;
                records::replace_all(txn.as_mut(), &debts).await?;
                Ok::<_, SyncError>(())
            })
            .await?;
        info!(
            transactions = transactions.len(),
            debts = debts.len(),
            "Refetched server state"
        );
        *self.state.last_synced_at.lock() = Some(Utc::now());
        Ok(())
    }

    pub(crate) async fn status(&self) -> StoreResult<SyncStatus> {
        let pending = SyncQueue::len(self.store.pool()).await?;
        Ok(SyncStatus {
            online: self.is_online(),
            syncing: self.state.syncing.try_lock().is_err(),
            pending,
            last_synced_at: *self.state.last_synced_at.lock(),
            last_error: self.state.last_error.lock().clone(),
        })
    }

    fn record(&self, report: &SyncReport) {
        *self.state.last_error.lock() = report.error.clone();
    }
}

/// Applies queued operations to lists fetched from the server.
fn apply_pending(
    transactions: &mut Vec<Transaction>,
    debts: &mut Vec<Debt>,
    pending: &[QueuedOperation],
) {
    for queued in pending {
        match &queued.operation {
            PendingOperation::Transaction(operation) => operation.apply_to(transactions),
            PendingOperation::Debt(operation) => operation.apply_to(debts),
            PendingOperation::Payment(payment) => {
                let Some(debt) = debts.iter_mut().find(|debt| debt.id == payment.debt_id) else {
                    continue;
                };
                if let Err(error) = debt.apply_payment(payment.payment.clone().into_payment()) {
                    warn!(%error, debt_id = %payment.debt_id, "Queued payment no longer applies");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use ledgercommon::{
        identifiers::Identifier,
        records::{DebtKind, NewPayment, Record, TransactionKind},
        sync::PaymentOperation,
    };
    use ledgerapiclient::StatusCode;
    use rust_decimal_macros::dec;

    use crate::{
        remote::test_utils::{Call, FakeRemote},
        utils::init_test_tracing,
    };

    use super::*;

    fn transaction(reason: &str) -> Transaction {
        Transaction {
            id: Identifier::random(),
            kind: TransactionKind::Expense,
            amount: dec!(25),
            date: Utc::now(),
            reason: reason.into(),
            category: "Food".into(),
            account_name: None,
        }
    }

    async fn setup() -> (SyncContext, Arc<FakeRemote>) {
        init_test_tracing();
        let store = LocalStore::in_memory().await.unwrap();
        let remote = Arc::new(FakeRemote::default());
        let context = SyncContext::new(store, remote.clone(), true);
        (context, remote)
    }

    async fn enqueue<R: Record>(
        context: &SyncContext,
        operation: SyncOperation<R>,
    ) {
        let mut connection = context.store.pool().acquire().await.unwrap();
        SyncQueue::enqueue(&mut connection, &operation).await.unwrap();
    }

    async fn cached_transactions(context: &SyncContext) -> Vec<Transaction> {
        records::load_all(context.store.pool()).await.unwrap()
    }

    #[tokio::test]
    async fn replays_in_order_and_refetches() {
        let (context, remote) = setup().await;
        let lunch = transaction("Lunch");
        let dinner = transaction("Dinner");
        let server_only = transaction("Groceries");
        remote.transactions.lock().push(server_only.clone());

        enqueue(&context, SyncOperation::Add(lunch.clone())).await;
        enqueue(&context, SyncOperation::Add(dinner.clone())).await;
        enqueue(&context, SyncOperation::<Transaction>::Delete { id: lunch.id }).await;
        enqueue(&context, SyncOperation::<Transaction>::Delete { id: server_only.id }).await;

        let report = context
            .process_sync_queue(&CancellationToken::new())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(
            report,
            SyncReport {
                synced: 2,
                rejected: 0,
                remaining: 0,
                refreshed: true,
                error: None,
            }
        );
        assert!(report.is_complete());
        // The delete of the unsynced record cancelled its add.
        assert_eq!(
            remote.calls(),
            vec![
                Call::CreateTransaction(dinner.id),
                Call::DeleteTransaction(server_only.id)
            ]
        );
        assert_eq!(cached_transactions(&context).await, vec![dinner]);
    }

    #[tokio::test]
    async fn stops_at_first_failure() {
        let (context, remote) = setup().await;
        let records = [transaction("First"), transaction("Second"), transaction("Third")];
        for record in &records {
            enqueue(&context, SyncOperation::Add(record.clone())).await;
        }
        remote
            .failures
            .lock()
            .push_back(Some(StatusCode::SERVICE_UNAVAILABLE));

        let report = context
            .process_sync_queue(&CancellationToken::new())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(report.synced, 0);
        assert_eq!(report.remaining, 3);
        assert!(report.refreshed);
        assert!(report.error.is_some());
        assert!(remote.calls().is_empty());
        // Queued records stay visible on top of the empty server state.
        assert_eq!(cached_transactions(&context).await.len(), 3);

        let report = context
            .process_sync_queue(&CancellationToken::new())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(report.synced, 3);
        assert!(report.is_complete());
        assert_eq!(
            remote.calls(),
            records
                .iter()
                .map(|record| Call::CreateTransaction(record.id))
                .collect::<Vec<_>>()
        );
    }

    #[tokio::test]
    async fn failure_in_the_middle_keeps_the_rest() {
        let (context, remote) = setup().await;
        let first = transaction("First");
        let second = transaction("Second");
        let third = transaction("Third");
        for record in [&first, &second, &third] {
            enqueue(&context, SyncOperation::Add(record.clone())).await;
        }
        remote
            .failures
            .lock()
            .extend([None, Some(StatusCode::INTERNAL_SERVER_ERROR)]);

        let report = context
            .process_sync_queue(&CancellationToken::new())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(report.synced, 1);
        assert_eq!(report.remaining, 2);
        assert_eq!(remote.calls(), vec![Call::CreateTransaction(first.id)]);
        let pending: Vec<_> = SyncQueue::load_all(context.store.pool())
            .await
            .unwrap()
            .into_iter()
            .map(|queued| queued.operation)
            .collect();
        assert_eq!(
            pending,
            vec![
                PendingOperation::Transaction(SyncOperation::Add(second)),
                PendingOperation::Transaction(SyncOperation::Add(third)),
            ]
        );
    }

    #[tokio::test]
    async fn delete_of_missing_record_counts_as_synced() {
        let (context, remote) = setup().await;
        let gone = transaction("Gone");
        enqueue(&context, SyncOperation::<Transaction>::Delete { id: gone.id }).await;

        let report = context
            .process_sync_queue(&CancellationToken::new())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(report.synced, 1);
        assert!(report.is_complete());
        assert_eq!(remote.calls(), vec![Call::DeleteTransaction(gone.id)]);
    }

    #[tokio::test]
    async fn rejected_operation_is_dropped() {
        let (context, remote) = setup().await;
        let first = transaction("First");
        let second = transaction("Second");
        enqueue(&context, SyncOperation::Add(first)).await;
        enqueue(&context, SyncOperation::Add(second.clone())).await;
        remote
            .failures
            .lock()
            .push_back(Some(StatusCode::BAD_REQUEST));

        let report = context
            .process_sync_queue(&CancellationToken::new())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(report.rejected, 1);
        assert_eq!(report.remaining, 1);
        // The rejected record disappears, the other one is still pending.
        assert_eq!(cached_transactions(&context).await, vec![second]);
    }

    #[tokio::test]
    async fn skipped_when_offline_or_empty() {
        let (context, remote) = setup().await;
        let token = CancellationToken::new();
        assert_eq!(context.process_sync_queue(&token).await.unwrap(), None);

        enqueue(&context, SyncOperation::Add(transaction("Lunch"))).await;
        context.set_online(false);
        assert_eq!(context.process_sync_queue(&token).await.unwrap(), None);
        assert!(remote.calls().is_empty());

        let status = context.status().await.unwrap();
        assert!(!status.online);
        assert_eq!(status.pending, 1);
    }

    #[tokio::test]
    async fn refresh_failure_keeps_local_data() {
        let (context, remote) = setup().await;
        let lunch = transaction("Lunch");
        records::upsert(context.store.pool(), &lunch).await.unwrap();
        enqueue(&context, SyncOperation::<Transaction>::Update(lunch.clone())).await;
        remote.unreachable.store(true, Ordering::SeqCst);

        let report = context
            .process_sync_queue(&CancellationToken::new())
            .await
            .unwrap()
            .unwrap();

        assert!(!report.refreshed);
        assert_eq!(report.remaining, 1);
        assert_eq!(cached_transactions(&context).await, vec![lunch]);
        let status = context.status().await.unwrap();
        assert!(status.last_error.is_some());
        assert_eq!(status.last_synced_at, None);
    }

    #[tokio::test]
    async fn pending_payments_are_applied_on_refetch() {
        let (context, remote) = setup().await;
        let debt = Debt::new(DebtKind::Debtor, dec!(100), "Judy", "Laptop repair");
        remote.debts.lock().push(debt.clone());
        context.set_online(false);
        let mut connection = context.store.pool().acquire().await.unwrap();
        SyncQueue::enqueue_payment(
            &mut *connection,
            &PaymentOperation {
                debt_id: debt.id,
                payment: NewPayment::new(dec!(30)),
            },
        )
        .await
        .unwrap();
        drop(connection);

        context.refresh().await.unwrap();

        let debts: Vec<Debt> = records::load_all(context.store.pool()).await.unwrap();
        assert_eq!(debts[0].paid_amount, dec!(30));
        assert!(remote.debts.lock()[0].payments.is_empty());

        context.set_online(true);
        let report = context
            .process_sync_queue(&CancellationToken::new())
            .await
            .unwrap()
            .unwrap();
        assert!(report.is_complete());
        assert_eq!(remote.debts.lock()[0].paid_amount, dec!(30));
        let debts: Vec<Debt> = records::load_all(context.store.pool()).await.unwrap();
        assert_eq!(debts[0].payments.len(), 1);
    }

    #[tokio::test]
    async fn cancelled_between_operations() {
        let (context, remote) = setup().await;
        let records = [transaction("First"), transaction("Second"), transaction("Third")];
        for record in &records {
            enqueue(&context, SyncOperation::Add(record.clone())).await;
        }
        let run_token = CancellationToken::new();
        *remote.cancel_on_call.lock() = Some(run_token.clone());

        let report = context
            .process_sync_queue(&run_token)
            .await
            .unwrap()
            .unwrap();

        // The call in progress finishes, the rest waits for the next run.
        assert_eq!(report.synced, 1);
        assert_eq!(report.remaining, 2);
        assert_eq!(report.error, None);
        assert_eq!(remote.calls(), vec![Call::CreateTransaction(records[0].id)]);
        let pending: Vec<_> = SyncQueue::load_all(context.store.pool())
            .await
            .unwrap()
            .into_iter()
            .map(|queued| queued.operation)
            .collect();
        assert_eq!(
            pending,
            vec![
                PendingOperation::Transaction(SyncOperation::Add(records[1].clone())),
                PendingOperation::Transaction(SyncOperation::Add(records[2].clone())),
            ]
        );
    }

    #[tokio::test]
    async fn skipped_while_another_sync_runs() {
        let (context, remote) = setup().await;
        enqueue(&context, SyncOperation::Add(transaction("Lunch"))).await;

        let paused = context.pause().await;
        assert!(context.status().await.unwrap().syncing);
        assert_eq!(
            context
                .process_sync_queue(&CancellationToken::new())
                .await
                .unwrap(),
            None
        );
        assert!(remote.calls().is_empty());

        drop(paused);
        let report = context
            .process_sync_queue(&CancellationToken::new())
            .await
            .unwrap()
            .unwrap();
        assert!(report.is_complete());
    }

    #[tokio::test]
    async fn delete_during_replay_of_add_reaches_the_server() {
        let (context, remote) = setup().await;
        let debt = Debt::new(DebtKind::Debt, dec!(45), "Lena", "Train tickets");
        enqueue(&context, SyncOperation::Add(debt.clone())).await;
        remote.hold_next.store(true, Ordering::SeqCst);

        let sync = tokio::spawn({
            let context = context.clone();
            async move {
                context
                    .process_sync_queue(&CancellationToken::new())
                    .await
            }
        });
        remote.entered.notified().await;
        enqueue(&context, SyncOperation::<Debt>::Delete { id: debt.id }).await;
        remote.release.notify_one();

        let report = sync.await.unwrap().unwrap().unwrap();
        assert!(report.is_complete());
        assert_eq!(report.synced, 2);
        assert_eq!(
            remote.calls(),
            vec![Call::CreateDebt(debt.id), Call::DeleteDebt(debt.id)]
        );
        assert!(remote.debts.lock().is_empty());
        let cached: Vec<Debt> = records::load_all(context.store.pool()).await.unwrap();
        assert!(cached.is_empty());
    }
}
