// SPDX-FileCopyrightText: 2025 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Handlers shared by all record kinds.

use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use ledgerbackend::ledger_service::{Created, ResourceService};
use ledgercommon::records::Record;

use crate::{error::ApiError, session::AuthenticatedUser};

use super::ApiJson;

pub(super) async fn list<R: Record>(
    AuthenticatedUser(username): AuthenticatedUser,
    State(service): State<ResourceService<R>>,
) -> Result<ApiJson<Vec<R>>, ApiError> {
    let records = service.list(&username).await?;
    Ok(ApiJson(records))
}

/// Answers 201 for a new record and 200 if the id was already taken.
pub(super) async fn create<R: Record>(
    AuthenticatedUser(username): AuthenticatedUser,
    State(service): State<ResourceService<R>>,
    ApiJson(record): ApiJson<R>,
) -> Result<(StatusCode, ApiJson<R>), ApiError> {
    let Created { record, created } = service.create(&username, record).await?;
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, ApiJson(record)))
}

pub(super) async fn get_one<R: Record>(
    AuthenticatedUser(username): AuthenticatedUser,
    State(service): State<ResourceService<R>>,
    Path(id): Path<R::Id>,
) -> Result<ApiJson<R>, ApiError> {
    let record = service.get(&username, id).await?;
    Ok(ApiJson(record))
}

pub(super) async fn update<R: Record>(
    AuthenticatedUser(username): AuthenticatedUser,
    State(service): State<ResourceService<R>>,
    Path(id): Path<R::Id>,
    ApiJson(record): ApiJson<R>,
) -> Result<ApiJson<R>, ApiError> {
    let record = service.update(&username, id, record).await?;
    Ok(ApiJson(record))
}
