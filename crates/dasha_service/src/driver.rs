//! Async driver for the expansion controller.
//!
//! Each ticket is fetched on its own tokio task under a timeout. Issuing a
//! new ticket aborts the task of the one it supersedes; completions that
//! still slip through are discarded by the controller's sequence check.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info_span, warn};

use dasha_base::dasha::NodeId;

use crate::controller::{ExpansionController, Resolution, Ticket};
use crate::error::{ServiceError, ServiceResult};
use crate::source::PeriodSource;

struct Completion {
    seq: u64,
    result: Result<Value, ServiceError>,
}

/// Delivers exactly one completion per fetch task.
///
/// If the task is torn down before [`CompletionGuard::send`] (a panic in the
/// source, or an abort), dropping the guard reports a `Task` error instead,
/// so a waiting driver never hangs on a request that is still `Loading`.
struct CompletionGuard {
    seq: u64,
    tx: Option<mpsc::UnboundedSender<Completion>>,
}

impl CompletionGuard {
    fn send(mut self, result: Result<Value, ServiceError>) {
        if let Some(tx) = self.tx.take() {
            // receiver lives as long as the driver
            let _ = tx.send(Completion {
                seq: self.seq,
                result,
            });
        }
    }
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(Completion {
                seq: self.seq,
                result: Err(ServiceError::Task("fetch was cancelled or panicked".into())),
            });
        }
    }
}

/// Runs a controller against a [`PeriodSource`].
pub struct ExpansionDriver<S: PeriodSource> {
    source: Arc<S>,
    controller: ExpansionController,
    timeout: Duration,
    clock: fn() -> DateTime<Utc>,
    inflight: Option<(u64, JoinHandle<()>)>,
    tx: mpsc::UnboundedSender<Completion>,
    rx: mpsc::UnboundedReceiver<Completion>,
}

impl<S: PeriodSource> ExpansionDriver<S> {
    pub fn new(source: S, controller: ExpansionController, timeout: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            source: Arc::new(source),
            controller,
            timeout,
            clock: Utc::now,
            inflight: None,
            tx,
            rx,
        }
    }

    /// Use another clock for current-period annotation.
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    pub fn controller(&self) -> &ExpansionController {
        &self.controller
    }

    pub fn start(&mut self) {
        let ticket = self.controller.start();
        self.dispatch(ticket);
    }

    pub fn drill_down(&mut self, id: &NodeId) -> ServiceResult<()> {
        let ticket = self.controller.drill_down(id)?;
        self.dispatch(ticket);
        Ok(())
    }

    pub fn navigate_to(&mut self, depth: usize) -> ServiceResult<()> {
        let ticket = self.controller.navigate_to(depth)?;
        self.dispatch(ticket);
        Ok(())
    }

    /// Re-issue the last failed request; false if there is nothing to retry.
    pub fn retry(&mut self) -> bool {
        match self.controller.retry() {
            Some(ticket) => {
                self.dispatch(ticket);
                true
            }
            None => false,
        }
    }

    fn dispatch(&mut self, ticket: Ticket) {
        if let Some((seq, handle)) = self.inflight.take() {
            debug!(seq, "aborting superseded fetch");
            handle.abort();
        }

        let Ticket { seq, request } = ticket;
        let source = Arc::clone(&self.source);
        let guard = CompletionGuard {
            seq,
            tx: Some(self.tx.clone()),
        };
        let limit = self.timeout;
        let span = info_span!("dasha_fetch", seq, level = %request.level);

        let handle = tokio::spawn(
            async move {
                let result = match tokio::time::timeout(limit, source.fetch(&request)).await {
                    Ok(result) => result,
                    Err(_) => {
                        warn!(?limit, "dasha fetch timed out");
                        Err(ServiceError::Timeout(limit))
                    }
                };
                guard.send(result);
            }
            .instrument(span),
        );
        self.inflight = Some((seq, handle));
    }

    /// Wait for the next completion and apply it.
    ///
    /// Returns `None` when nothing is in flight.
    pub async fn next_resolution(&mut self) -> Option<Resolution> {
        if !self.controller.is_loading() {
            return None;
        }
        let completion = self.rx.recv().await?;
        if self
            .inflight
            .as_ref()
            .is_some_and(|(seq, _)| *seq == completion.seq)
        {
            self.inflight = None;
        }
        let now = (self.clock)();
        Some(
            self.controller
                .resolve(completion.seq, completion.result, now),
        )
    }

    /// Wait until the authoritative request resolves, skipping stale completions.
    pub async fn settle(&mut self) -> Option<Resolution> {
        loop {
            match self.next_resolution().await? {
                Resolution::Stale => continue,
                other => return Some(other),
            }
        }
    }
}

impl<S: PeriodSource> Drop for ExpansionDriver<S> {
    fn drop(&mut self) {
        if let Some((_, handle)) = self.inflight.take() {
            handle.abort();
        }
    }
}
