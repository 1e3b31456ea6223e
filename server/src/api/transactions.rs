// SPDX-FileCopyrightText: 2025 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use ledgerbackend::ledger_service::ResourceService;
use ledgercommon::{identifiers::TransactionId, records::Transaction};

use crate::{error::ApiError, session::AuthenticatedUser};

pub(super) async fn delete(
    AuthenticatedUser(username): AuthenticatedUser,
    State(service): State<ResourceService<Transaction>>,
    Path(id): Path<TransactionId>,
) -> Result<StatusCode, ApiError> {
    service.delete(&username, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
