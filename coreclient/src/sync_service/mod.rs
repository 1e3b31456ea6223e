// SPDX-FileCopyrightText: 2025 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Background replay of the sync queue.
//!
//! Callers request runs; requests that arrive before a run starts share it.
//! Every request gets a [`SyncDone`] future which resolves with the report of
//! the run that covered it.

use std::{
    fmt,
    pin::Pin,
    sync::{Arc, Weak},
    task::{Context, Poll},
};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub(crate) use replay::SyncContext;
pub use replay::{SyncReport, SyncStatus};

mod replay;

#[derive(Debug, Default)]
struct ServiceState {
    /// Present while the service is started. Stopping cancels it.
    running: Option<CancellationToken>,
    /// Generation of the latest requested run.
    requested: u64,
    /// Generation of the run in progress, or of the last one.
    started: u64,
    /// Generation of the last finished or skipped run.
    finished: u64,
    /// Report of the last finished run.
    last_report: Option<SyncReport>,
}

impl ServiceState {
    /// Returns the generation of the run that will serve a request made now.
    fn request_run(&mut self) -> u64 {
        // A run which has not started yet picks up the new request as well.
        if self.requested == self.started {
            self.requested += 1;
        }
        self.requested
    }
}

#[derive(Debug)]
pub(crate) struct SyncService {
    context: SyncContext,
    state: Arc<watch::Sender<ServiceState>>,
}

impl SyncService {
    /// Spawns the background task. The service starts stopped.
    pub(crate) fn new(context: SyncContext) -> Self {
        let (state, state_rx) = watch::channel(ServiceState::default());
        let state = Arc::new(state);
        let task = SyncTask {
            context: context.clone(),
            state: Arc::downgrade(&state),
        };
        tokio::spawn(task.run(state_rx));
        Self { context, state }
    }

    pub(crate) fn context(&self) -> &SyncContext {
        &self.context
    }

    /// Starts the service and requests a run.
    pub(crate) fn start(&self) -> SyncDone {
        let mut generation = 0;
        self.state.send_modify(|state| {
            state.running.get_or_insert_with(CancellationToken::new);
            generation = state.request_run();
        });
        debug!(generation, "Starting background sync");
        self.done(generation)
    }

    /// Stops the service. A running replay stops before its next operation.
    ///
    /// The returned future resolves when the background task is idle.
    pub(crate) fn stop(&self) -> SyncDone {
        let mut generation = 0;
        self.state.send_modify(|state| {
            if let Some(run_token) = state.running.take() {
                run_token.cancel();
            }
            generation = state.requested;
        });
        debug!(generation, "Stopping background sync");
        self.done(generation)
    }

    /// Requests a run. Resolves with `None` at once while stopped.
    pub(crate) fn notify_work(&self) -> SyncDone {
        let mut generation = None;
        self.state.send_if_modified(|state| {
            if state.running.is_none() {
                return false;
            }
            generation = Some(state.request_run());
            true
        });
        match generation {
            Some(generation) => self.done(generation),
            None => {
                debug!("Background sync is stopped; ignoring request");
                SyncDone::ready()
            }
        }
    }

    fn done(&self, generation: u64) -> SyncDone {
        let mut state_rx = self.state.subscribe();
        SyncDone::new(async move {
            let state = state_rx
                .wait_for(|state| state.finished >= generation)
                .await
                .ok()?;
            state.last_report.clone()
        })
    }
}

struct SyncTask {
    context: SyncContext,
    state: Weak<watch::Sender<ServiceState>>,
}

enum Next {
    Run(u64, CancellationToken),
    Skip(u64),
    Idle,
}

impl SyncTask {
    /// Ends when the service is dropped.
    async fn run(self, mut state_rx: watch::Receiver<ServiceState>) {
        while state_rx.changed().await.is_ok() {
            let next = {
                let state = state_rx.borrow_and_update();
                match &state.running {
                    _ if state.requested == state.finished => Next::Idle,
                    Some(run_token) => Next::Run(state.requested, run_token.clone()),
                    None => Next::Skip(state.requested),
                }
            };
            let Some(state) = self.state.upgrade() else {
                break;
            };
            match next {
                Next::Idle => {}
                Next::Skip(generation) => {
                    debug!(generation, "Background sync stopped; skipping run");
                    state.send_modify(|state| {
                        state.started = generation;
                        state.finished = generation;
                        state.last_report = None;
                    });
                }
                Next::Run(generation, run_token) => {
                    state.send_modify(|state| state.started = generation);
                    drop(state);
                    debug!(generation, "Running background sync");
                    let report = self.context.work(run_token).await;
                    let Some(state) = self.state.upgrade() else {
                        break;
                    };
                    state.send_modify(|state| {
                        state.finished = generation;
                        state.last_report = report;
                    });
                }
            }
        }
    }
}

/// Resolves with the report of the background run serving a request.
///
/// The value is `None` if the run had nothing to do, failed before replaying
/// or was skipped because the service stopped. Dropping the future does not
/// cancel the run.
pub struct SyncDone {
    inner: Pin<Box<dyn Future<Output = Option<SyncReport>> + Send>>,
}

impl SyncDone {
    fn new(future: impl Future<Output = Option<SyncReport>> + Send + 'static) -> Self {
        Self {
            inner: Box::pin(future),
        }
    }

    fn ready() -> Self {
        Self::new(std::future::ready(None))
    }
}

impl fmt::Debug for SyncDone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncDone").finish_non_exhaustive()
    }
}

impl Future for SyncDone {
    type Output = Option<SyncReport>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.inner.as_mut().poll(cx)
    }
}
