// SPDX-FileCopyrightText: 2025 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! REST endpoints.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{FromRef, FromRequest, FromRequestParts},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use ledgerbackend::{
    auth_service::AuthService, blob_store::BlobStore, ledger_service::ResourceService,
};
use ledgercommon::records::{Debt, Transaction};
use serde::Serialize;

use crate::{error::ApiError, session::SessionKeys};

mod auth;
mod debts;
mod records;
mod summary;
mod transactions;

/// Shared state of all handlers.
#[derive(Clone, FromRef)]
pub struct AppState {
    pub transactions: ResourceService<Transaction>,
    pub debts: ResourceService<Debt>,
    pub auth_service: AuthService,
    pub session_keys: SessionKeys,
}

impl AppState {
    pub fn new(blobs: Arc<dyn BlobStore>, session_keys: SessionKeys) -> Self {
        Self {
            transactions: ResourceService::new(blobs.clone()),
            debts: ResourceService::new(blobs.clone()),
            auth_service: AuthService::new(blobs),
            session_keys,
        }
    }
}

/// JSON body whose rejections are answered like every other error.
#[derive(FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
pub(crate) struct ApiJson<T>(pub(crate) T);

impl<T: Serialize> IntoResponse for ApiJson<T> {
    fn into_response(self) -> Response {
        Json(self.0).into_response()
    }
}

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub(crate) struct ApiQuery<T>(pub(crate) T);

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/auth/signup", post(auth::signup))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route(
            "/api/transactions",
            get(records::list::<Transaction>).post(records::create::<Transaction>),
        )
        .route(
            "/api/transactions/{id}",
            get(records::get_one::<Transaction>)
                .put(records::update::<Transaction>)
                .delete(transactions::delete),
        )
        .route(
            "/api/debts",
            get(records::list::<Debt>).post(records::create::<Debt>),
        )
        .route(
            "/api/debts/{id}",
            get(records::get_one::<Debt>)
                .put(records::update::<Debt>)
                .delete(debts::delete),
        )
        .route("/api/debts/{id}/payments", post(debts::add_payment))
        .route("/api/summary", get(summary::summary))
        .route("/api/reports/monthly", get(summary::monthly_report))
        .with_state(state)
}

async fn health() -> StatusCode {
    StatusCode::OK
}
