// SPDX-FileCopyrightText: 2025 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use axum::{extract::State, http::StatusCode};
use axum_extra::extract::CookieJar;
use ledgerbackend::auth_service::AuthService;
use ledgercommon::{
    messages::{LoginRequest, LoginResponse, SignupRequest},
    records::User,
};
use tracing::info;

use crate::{error::ApiError, session::SessionKeys};

use super::ApiJson;

pub(super) async fn signup(
    State(auth_service): State<AuthService>,
    ApiJson(request): ApiJson<SignupRequest>,
) -> Result<(StatusCode, ApiJson<User>), ApiError> {
    let user = auth_service.signup(request).await?;
    Ok((StatusCode::CREATED, ApiJson(user)))
}

/// Answers with the user and a session token. The token is also set as an
/// HTTP only cookie.
pub(super) async fn login(
    State(auth_service): State<AuthService>,
    State(session_keys): State<SessionKeys>,
    jar: CookieJar,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<(CookieJar, ApiJson<LoginResponse>), ApiError> {
    let user = auth_service.login(&request).await?;
    let token = session_keys
        .issue(&user.username)
        .map_err(|error| ApiError::internal("Login failed", error))?;
    info!(username = %user.username, "User logged in");
    let jar = jar.add(session_keys.session_cookie(token.clone()));
    Ok((jar, ApiJson(LoginResponse { user, token })))
}

pub(super) async fn logout(jar: CookieJar) -> (StatusCode, CookieJar) {
    (StatusCode::NO_CONTENT, jar.add(SessionKeys::expired_cookie()))
}
