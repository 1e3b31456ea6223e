// SPDX-FileCopyrightText: 2025 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

// Metric names follow the Prometheus conventions for HTTP servers.

use std::{
    pin::Pin,
    task::{Context, Poll, ready},
    time::{Duration, Instant},
};

use anyhow::Context as _;
use axum::{
    Router,
    extract::{MatchedPath, State},
    http::{Request, Response},
    routing::get,
};
use metrics::{Unit, counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use pin_project::pin_project;
use tokio::net::TcpListener;
use tower::{Layer, Service};
use tracing::{error, info};

/// Interval at which the recorder drains its histogram buckets.
const UPKEEP_INTERVAL: Duration = Duration::from_secs(5);

/// Installs the Prometheus recorder and serves `/metrics` on a separate
/// listener in the background.
pub(crate) fn serve_metrics(listener: TcpListener) -> anyhow::Result<()> {
    let addr = listener.local_addr()?;
    let recorder = PrometheusBuilder::new().build_recorder();
    let handle = recorder.handle();
    metrics::set_global_recorder(recorder).context("metrics recorder already installed")?;

    let upkeep_handle = handle.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(UPKEEP_INTERVAL);
        loop {
            interval.tick().await;
            upkeep_handle.run_upkeep();
        }
    });

    let app = Router::new()
        .route("/metrics", get(render_metrics))
        .with_state(handle);
    tokio::spawn(async move {
        info!(%addr, "Serving metrics");
        if let Err(error) = axum::serve(listener, app).await {
            error!(%error, "Metrics endpoint stopped");
        }
    });
    Ok(())
}

async fn render_metrics(State(handle): State<PrometheusHandle>) -> String {
    handle.render()
}

#[derive(Clone, Default)]
pub(crate) struct HttpMetricsLayer {}

impl HttpMetricsLayer {
    pub(crate) fn new() -> Self {
        Default::default()
    }

    pub(crate) fn describe_metrics() {
        describe_counter!(
            "http_server_requests_started_total",
            "Total number of requests started on the server."
        );
        describe_counter!(
            "http_server_requests_handled_total",
            "Total number of requests completed on the server, regardless of the status."
        );
        describe_histogram!(
            "http_server_request_duration_seconds",
            Unit::Seconds,
            "Histogram of response latency (seconds) of requests handled by the server.",
        );
    }
}

impl<S> Layer<S> for HttpMetricsLayer {
    type Service = HttpMetricsService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        HttpMetricsService { inner }
    }
}

#[derive(Clone)]
pub(crate) struct HttpMetricsService<S> {
    inner: S,
}

impl<S, B, C> Service<Request<B>> for HttpMetricsService<S>
where
    S: Service<Request<B>, Response = Response<C>>,
{
    type Response = S::Response;

    type Error = S::Error;

    type Future = HttpMetricsFuture<S::Future>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<B>) -> Self::Future {
        // Label by route template so that ids in paths do not blow up cardinality.
        let route = req
            .extensions()
            .get::<MatchedPath>()
            .map(|path| path.as_str().to_owned())
            .unwrap_or_else(|| "unmatched".to_owned());
        let method = req.method().as_str().to_owned();

        HttpMetricsFuture {
            inner: self.inner.call(req),
            route,
            method,
            started_at: None,
        }
    }
}

#[pin_project]
pub(crate) struct HttpMetricsFuture<F> {
    #[pin]
    inner: F,
    route: String,
    method: String,
    started_at: Option<Instant>,
}

impl<F, B, E> Future for HttpMetricsFuture<F>
where
    F: Future<Output = Result<Response<B>, E>>,
{
    type Output = Result<Response<B>, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();

        let started_at = this.started_at.get_or_insert_with(|| {
            counter!(
                "http_server_requests_started_total",
                "route" => this.route.clone(),
                "method" => this.method.clone(),
            )
            .increment(1);
            Instant::now()
        });

        let result = ready!(this.inner.poll(cx));
        let elapsed = started_at.elapsed();

        let status = match &result {
            Ok(response) => response.status().as_u16().to_string(),
            Err(_) => "error".to_owned(),
        };

        counter!(
            "http_server_requests_handled_total",
            "route" => this.route.clone(),
            "method" => this.method.clone(),
            "status" => status.clone(),
        )
        .increment(1);

        histogram!(
            "http_server_request_duration_seconds",
            "route" => this.route.clone(),
            "method" => this.method.clone(),
            "status" => status,
        )
        .record(elapsed.as_secs_f64());

        Poll::Ready(result)
    }
}
