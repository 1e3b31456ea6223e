// SPDX-FileCopyrightText: 2023 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::net::SocketAddr;

use ledgerapiclient::ApiClient;
use ledgerbackend::settings::RateLimitsSettings;
use ledgercommon::messages::SignupRequest;
use ledgercoreclient::{CoreUser, LocalStore};
use rand::{Rng, distributions::Alphanumeric};
use tempfile::TempDir;
use tracing::info;
use url::Url;
use zeroize::Zeroizing;

use super::{TEST_RATE_LIMITS, controlled_listener::ControlHandle, spawn_app};

pub const TEST_PASSWORD: &str = "correct horse battery";

/// A logged in client with its own local database.
pub struct TestUser {
    pub user: CoreUser,
    pub username: String,
    pub password: String,
    db_dir: TempDir,
}

impl TestUser {
    /// Opens a second client on the same local database, as an app does
    /// after a restart.
    pub async fn restart(&self, server_url: &Url) -> CoreUser {
        let store = LocalStore::open(self.db_dir.path().join("ledger.db"))
            .await
            .unwrap();
        CoreUser::new(server_url, store).await.unwrap()
    }
}

pub struct TestBackend {
    address: SocketAddr,
    control: ControlHandle,
}

impl TestBackend {
    pub async fn single() -> Self {
        Self::single_with_rate_limits(TEST_RATE_LIMITS).await
    }

    pub async fn single_with_rate_limits(rate_limits: RateLimitsSettings) -> Self {
        let (address, control) = spawn_app(rate_limits).await;
        info!(%address, "Spawned test server");
        Self { address, control }
    }

    pub fn address(&self) -> SocketAddr {
        self.address
    }

    pub fn server_url(&self) -> Url {
        format!("http://{}", self.address).parse().unwrap()
    }

    /// Switches the network conditions between the clients and the server.
    pub fn control(&self) -> &ControlHandle {
        &self.control
    }

    /// A client without a session.
    pub fn api_client(&self) -> ApiClient {
        ApiClient::with_endpoint(&self.server_url()).unwrap()
    }

    /// Registers a user with a random name.
    pub async fn signup(&self, api_client: &ApiClient) -> SignupRequest {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(8)
            .map(char::from)
            .collect();
        let request = SignupRequest {
            first_name: "Test".into(),
            last_name: "User".into(),
            username: format!("user_{suffix}"),
            mobile: "+41 79 000 00 00".into(),
            password: Zeroizing::new(TEST_PASSWORD.to_owned()),
        };
        api_client.signup(&request).await.unwrap();
        request
    }

    /// Signs up a new user and logs in a client with a fresh local database.
    pub async fn add_user(&self) -> TestUser {
        let db_dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(db_dir.path().join("ledger.db"))
            .await
            .unwrap();
        let user = CoreUser::new(&self.server_url(), store).await.unwrap();
        let request = self.signup(user.api_client()).await;
        user.login(&request.username, TEST_PASSWORD).await.unwrap();
        info!(username = %request.username, "Added test user");
        TestUser {
            user,
            username: request.username,
            password: TEST_PASSWORD.to_owned(),
            db_dir,
        }
    }
}
