// SPDX-FileCopyrightText: 2023 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{net::SocketAddr, sync::Arc, time::Duration};

pub mod controlled_listener;
pub mod setup;

use ledgerbackend::{blob_store::MemoryBlobStore, settings::RateLimitsSettings};
use ledgerserver::{ServerRunParams, configurations::get_configuration_from_str, run};
use tokio::net::TcpListener;

use crate::{
    init_test_tracing,
    utils::controlled_listener::{ControlHandle, ControlledListener},
};

const BASE_CONFIG: &str = include_str!("../../../server/configuration/base.yaml");
const LOCAL_CONFIG: &str = include_str!("../../../server/configuration/local.yaml");

pub const TEST_RATE_LIMITS: RateLimitsSettings = RateLimitsSettings {
    period: Duration::from_millis(1),
    burst: 1000,
};

/// Starts a server with an in-memory blob store on a random port.
///
/// The returned handle decides whether the server accepts connections.
pub(crate) async fn spawn_app(rate_limits: RateLimitsSettings) -> (SocketAddr, ControlHandle) {
    init_test_tracing();

    // Load configuration
    let configuration = get_configuration_from_str(BASE_CONFIG, LOCAL_CONFIG)
        .expect("Could not load configuration.");

    // Port binding
    let mut listen = configuration.application.listen;
    listen.set_port(0); // Bind to a random port

    let listener = TcpListener::bind(listen)
        .await
        .expect("Failed to bind to random port.");
    let address = listener.local_addr().unwrap();
    let (listener, control) = ControlledListener::from_listener(listener);

    // Start the server
    let server = run(ServerRunParams {
        listener,
        metrics_listener: None,
        blobs: Arc::new(MemoryBlobStore::default()),
        auth: configuration.auth,
        rate_limits,
    })
    .await
    .expect("Failed to set up the server");

    // Execute the server in the background
    tokio::spawn(server);

    (address, control)
}
