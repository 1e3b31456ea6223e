// SPDX-FileCopyrightText: 2023 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! HTTP server exposing the ledger backend as a JSON API.

use std::{io, net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use axum::{
    extract::{ConnectInfo, Request, connect_info::Connected},
    middleware::{self, Next},
    response::Response,
    serve::{IncomingStream, Listener},
};
use ledgerbackend::{blob_store::BlobStore, settings::AuthSettings, settings::RateLimitsSettings};
use tokio::net::TcpListener;
use tower_governor::{
    GovernorLayer, governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor,
};
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{Level, enabled, error, info};

use crate::{
    api::{AppState, router},
    http_metrics::{HttpMetricsLayer, serve_metrics},
    session::SessionKeys,
};

pub mod api;
pub mod args;
pub mod configurations;
pub mod error;
mod http_metrics;
pub mod logging;
pub mod session;
pub mod user_command;

pub struct ServerRunParams<L> {
    pub listener: L,
    pub metrics_listener: Option<TcpListener>,
    pub blobs: Arc<dyn BlobStore>,
    pub auth: AuthSettings,
    pub rate_limits: RateLimitsSettings,
}

/// Sets up the router and returns the future serving it.
///
/// Fails if the metrics endpoint or the rate limiter cannot be set up.
pub async fn run<L>(
    ServerRunParams {
        listener,
        metrics_listener,
        blobs,
        auth,
        rate_limits,
    }: ServerRunParams<L>,
) -> anyhow::Result<impl Future<Output = io::Result<()>>>
where
    L: Listener<Addr = SocketAddr>,
{
    match listener.local_addr() {
        Ok(http_addr) => info!(%http_addr, "Starting server"),
        Err(error) => error!(%error, "Could not get local address"),
    }

    HttpMetricsLayer::describe_metrics();
    if let Some(metrics_listener) = metrics_listener {
        serve_metrics(metrics_listener)?;
    }

    info!(?rate_limits, "Applying rate limits");
    let governor_config = GovernorConfigBuilder::default()
        .period(rate_limits.period)
        .burst_size(rate_limits.burst)
        .key_extractor(SmartIpKeyExtractor)
        .finish()
        .context("rate limits need a non-zero period and burst")?;

    // Stale entries of the per IP limiter are purged every minute.
    let limiter = governor_config.limiter().clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            limiter.retain_recent();
        }
    });

    let state = AppState::new(blobs, SessionKeys::new(&auth));
    let app = router(state)
        .route_layer(HttpMetricsLayer::new())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(
                    DefaultMakeSpan::new()
                        .level(Level::INFO)
                        .include_headers(enabled!(Level::DEBUG)),
                )
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(
                    DefaultOnResponse::new()
                        .level(Level::INFO)
                        .include_headers(enabled!(Level::DEBUG)),
                ),
        )
        .layer(GovernorLayer::new(governor_config))
        .layer(middleware::from_fn(expose_peer_addr));

    Ok(axum::serve(
        listener,
        app.into_make_service_with_connect_info::<PeerAddr>(),
    )
    .into_future())
}

/// Remote address of a connection accepted by any [`Listener`] with socket
/// addresses.
#[derive(Debug, Clone, Copy)]
pub struct PeerAddr(pub SocketAddr);

impl<L> Connected<IncomingStream<'_, L>> for PeerAddr
where
    L: Listener<Addr = SocketAddr>,
{
    fn connect_info(stream: IncomingStream<'_, L>) -> Self {
        Self(*stream.remote_addr())
    }
}

/// The rate limiter keys on `ConnectInfo<SocketAddr>`.
async fn expose_peer_addr(
    ConnectInfo(PeerAddr(addr)): ConnectInfo<PeerAddr>,
    mut request: Request,
    next: Next,
) -> Response {
    request.extensions_mut().insert(ConnectInfo(addr));
    next.run(request).await
}
