// SPDX-FileCopyrightText: 2023 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! API client implementation for the auth endpoints

use ledgercommon::{
    messages::{LoginRequest, LoginResponse, SignupRequest},
    records::User,
};
use reqwest::Method;
use tracing::info;

use crate::{ApiClient, ApiRequestError};

impl ApiClient {
    /// Registers a new user. Does not log in.
    pub async fn signup(&self, request: &SignupRequest) -> Result<User, ApiRequestError> {
        let request = self.request(Method::POST, "/api/auth/signup")?.json(request);
        self.send_json(request).await
    }

    /// Logs in and keeps the returned session token for subsequent requests.
    pub async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, ApiRequestError> {
        let request = self.request(Method::POST, "/api/auth/login")?.json(request);
        let response: LoginResponse = self.send_json(request).await?;
        info!(username = %response.user.username, "Logged in");
        self.set_token(Some(response.token.clone()));
        Ok(response)
    }

    /// Ends the session. The token is forgotten even if the server is not
    /// reachable.
    pub async fn logout(&self) -> Result<(), ApiRequestError> {
        let request = self.request(Method::POST, "/api/auth/logout");
        self.set_token(None);
        self.send_empty(request?).await
    }
}
