// SPDX-FileCopyrightText: 2025 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use ledgerbackend::ledger_service::ResourceService;
use ledgercommon::{
    identifiers::DebtId,
    messages::MessageResponse,
    records::{Debt, NewPayment},
};

use crate::{error::ApiError, session::AuthenticatedUser};

use super::ApiJson;

pub(super) async fn delete(
    AuthenticatedUser(username): AuthenticatedUser,
    State(service): State<ResourceService<Debt>>,
    Path(id): Path<DebtId>,
) -> Result<ApiJson<MessageResponse>, ApiError> {
    service.delete(&username, id).await?;
    Ok(ApiJson(MessageResponse {
        message: "Debt record deleted successfully".to_owned(),
    }))
}

pub(super) async fn add_payment(
    AuthenticatedUser(username): AuthenticatedUser,
    State(service): State<ResourceService<Debt>>,
    Path(id): Path<DebtId>,
    ApiJson(payment): ApiJson<NewPayment>,
) -> Result<(StatusCode, ApiJson<Debt>), ApiError> {
    let debt = service.add_payment(&username, id, payment).await?;
    Ok((StatusCode::CREATED, ApiJson(debt)))
}
