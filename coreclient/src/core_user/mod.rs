// SPDX-FileCopyrightText: 2025 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! The logged in user as seen by an app: local data, which is always
//! available, and the connection to the server, which is not.

use std::sync::Arc;

use anyhow::Context;
use ledgerapiclient::ApiClient;
use ledgercommon::{
    messages::{LoginRequest, LoginResponse, SignupRequest},
    records::User,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use url::Url;
use zeroize::Zeroizing;

use crate::{
    error::SyncError,
    store::{LocalStore, StoredSession},
    sync_queue::{QueuedOperation, SyncQueue},
    sync_service::{SyncContext, SyncDone, SyncReport, SyncService, SyncStatus},
};

mod accounts;
mod records;

#[derive(Debug, Clone)]
pub struct CoreUser {
    inner: Arc<CoreUserInner>,
}

#[derive(Debug)]
struct CoreUserInner {
    store: LocalStore,
    api_client: ApiClient,
    sync_service: SyncService,
}

impl CoreUser {
    /// Creates a client talking to the server at `server_url`.
    ///
    /// A session stored by an earlier login is restored. The client starts
    /// online; call [`CoreUser::set_online`] when connectivity changes.
    pub async fn new(server_url: &Url, store: LocalStore) -> anyhow::Result<Self> {
        let api_client = ApiClient::with_endpoint(server_url)?;
        Self::with_api_client(api_client, store).await
    }

    pub async fn with_api_client(api_client: ApiClient, store: LocalStore) -> anyhow::Result<Self> {
        if let Some(session) = StoredSession::load(store.pool()).await? {
            info!(username = %session.user.username, "Restoring session");
            api_client.set_token(Some(session.token.to_string()));
        }
        let context = SyncContext::new(store.clone(), Arc::new(api_client.clone()), true);
        let sync_service = SyncService::new(context);
        sync_service.start();
        Ok(Self {
            inner: Arc::new(CoreUserInner {
                store,
                api_client,
                sync_service,
            }),
        })
    }

    pub(crate) fn store(&self) -> &LocalStore {
        &self.inner.store
    }

    pub fn api_client(&self) -> &ApiClient {
        &self.inner.api_client
    }

    fn sync_context(&self) -> &SyncContext {
        self.inner.sync_service.context()
    }

    /// Registers a new user on the server. Does not log in.
    pub async fn signup(&self, request: &SignupRequest) -> anyhow::Result<User> {
        request.validate()?;
        let user = self.inner.api_client.signup(request).await?;
        info!(username = %user.username, "Signed up");
        Ok(user)
    }

    /// Logs in and stores the session.
    ///
    /// Local data of a different user who was logged in before is removed.
    pub async fn login(&self, username: &str, password: &str) -> anyhow::Result<User> {
        let request = LoginRequest {
            username: username.trim().to_owned(),
            password: Zeroizing::new(password.to_owned()),
        };
        request.validate()?;

        // The queue must not be replayed with the new token before the
        // previous user's changes are gone.
        self.inner.sync_service.stop().await;
        let result = async {
            let _paused = self.sync_context().pause().await;
            let LoginResponse { user, token } = self.inner.api_client.login(&request).await?;

            let pool = self.store().pool();
            let previous = StoredSession::load(pool).await?;
            if previous.is_some_and(|session| session.user.username != user.username) {
                info!("Different user logged in; clearing local data");
                self.store()
                    .clear()
                    .await
                    .context("Failed to clear local data")?;
            }
            StoredSession::new(user.clone(), token).store(pool).await?;
            anyhow::Ok(user)
        }
        .await;
        self.restart_sync();
        result
    }

    /// Logs out and removes all local data, including changes which were not
    /// synced yet.
    pub async fn logout(&self) -> anyhow::Result<()> {
        self.inner.sync_service.stop().await;
        let result = async {
            let _paused = self.sync_context().pause().await;
            if let Err(error) = self.inner.api_client.logout().await {
                warn!(%error, "Failed to log out on the server");
            }
            self.store()
                .clear()
                .await
                .context("Failed to clear local data")
        }
        .await;
        self.restart_sync();
        result
    }

    fn restart_sync(&self) {
        if self.sync_context().is_online() {
            self.inner.sync_service.start();
        }
    }

    pub async fn current_user(&self) -> anyhow::Result<Option<User>> {
        let session = StoredSession::load(self.store().pool()).await?;
        Ok(session.map(|session| session.user))
    }

    /// Brings the local data up to date after the app starts.
    ///
    /// When online, pending changes are synced and the server state is
    /// fetched. If the server cannot be reached, the local data is kept.
    pub async fn initial_load(&self) -> anyhow::Result<SyncReport> {
        let context = self.sync_context();
        let pool = self.store().pool();
        if !context.is_online() {
            return Ok(SyncReport {
                remaining: SyncQueue::len(pool).await?,
                ..Default::default()
            });
        }
        if let Some(report) = context
            .process_sync_queue(&CancellationToken::new())
            .await?
        {
            return Ok(report);
        }
        let mut report = SyncReport::default();
        match context.refresh().await {
            Ok(()) => report.refreshed = true,
            Err(error) => {
                warn!(%error, "Failed to load server state; using local data");
                report.error = Some(error.to_string());
            }
        }
        report.remaining = SyncQueue::len(pool).await?;
        Ok(report)
    }

    /// Tells the client whether the server is reachable.
    ///
    /// Going online syncs pending changes in the background. The returned
    /// future resolves when that sync is done. Going offline cancels a
    /// running sync.
    pub fn set_online(&self, online: bool) -> SyncDone {
        info!(online, "Connectivity changed");
        self.sync_context().set_online(online);
        if online {
            self.inner.sync_service.start()
        } else {
            self.inner.sync_service.stop()
        }
    }

    pub fn is_online(&self) -> bool {
        self.sync_context().is_online()
    }

    /// Asks the background task to sync. The returned future resolves when
    /// the sync is done; it resolves immediately when offline.
    pub fn request_sync(&self) -> SyncDone {
        self.inner.sync_service.notify_work()
    }

    /// Syncs in the foreground and returns what happened.
    ///
    /// Returns `None` when offline, when a sync is already running or when
    /// there is nothing to sync.
    pub async fn sync(&self) -> Result<Option<SyncReport>, SyncError> {
        self.sync_context()
            .process_sync_queue(&CancellationToken::new())
            .await
    }

    pub async fn pending_operations(&self) -> anyhow::Result<Vec<QueuedOperation>> {
        Ok(SyncQueue::load_all(self.store().pool()).await?)
    }

    pub async fn sync_status(&self) -> anyhow::Result<SyncStatus> {
        Ok(self.sync_context().status().await?)
    }
}
