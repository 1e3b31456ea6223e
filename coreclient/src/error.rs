// SPDX-FileCopyrightText: 2025 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use ledgerapiclient::ApiRequestError;
use thiserror::Error;

use crate::store::StoreError;

/// Failure while replaying the sync queue or refetching server state.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Api(#[from] ApiRequestError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SyncError {
    /// Whether the server will never accept the operation that failed.
    ///
    /// Missing sessions, timeouts and rate limits are not rejections.
    pub fn is_rejection(&self) -> bool {
        let Self::Api(error) = self else {
            return false;
        };
        error.status().is_some_and(|status| {
            status.is_client_error()
                && !error.is_unauthorized()
                && !error.is_recoverable()
                && status.as_u16() != 408
        })
    }
}

impl From<sqlx::Error> for SyncError {
    fn from(error: sqlx::Error) -> Self {
        Self::Store(error.into())
    }
}

/// A record to be changed or deleted is not in the local cache.
#[derive(Debug, Error)]
#[error("{0} not found")]
pub struct RecordNotFound(pub &'static str);
