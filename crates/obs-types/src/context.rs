use std::time::Instant;

use tokio::sync::watch;

use crate::error::ObsError;

/// Ambient per-request carrier for deadline and cancellation (spec §4.9,
/// §5). Every public operation takes one by reference; the core never
/// constructs one outside of tests — that is the RPC layer's job.
///
/// Cloning a `RequestContext` is cheap and shares the same cancellation
/// signal, mirroring how the teacher lineage threads a single
/// `before_search`/`deadline` pair through a federated search's fan-out
/// (see `perform_federated_search` in the upstream federated search path).
#[derive(Debug, Clone)]
pub struct RequestContext {
    deadline: Option<Instant>,
    cancelled: watch::Receiver<bool>,
}

/// Paired handle that trips the cancellation signal of the `RequestContext`
/// it was created alongside. Held by the RPC layer, never by the core.
#[derive(Debug, Clone)]
pub struct CancelHandle(watch::Sender<bool>);

impl CancelHandle {
    pub fn cancel(&self) {
        // A closed receiver (context already dropped) is not an error here.
        let _ = self.0.send(true);
    }
}

impl RequestContext {
    pub fn new(deadline: Option<Instant>) -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        (Self { deadline, cancelled: rx }, CancelHandle(tx))
    }

    /// A context with no deadline and no way to be cancelled; for tests and
    /// for callers that genuinely want "run to completion".
    pub fn unbounded() -> Self {
        Self::new(None).0
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancelled.borrow() || self.is_past_deadline()
    }

    pub fn is_past_deadline(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Returns `Err(ObsError::Cancelled)` if the context has already been
    /// cancelled or its deadline has elapsed; `Ok(())` otherwise. Called at
    /// component boundaries between awaits, never inside pure CPU work
    /// (spec §5: "no suspension occurs inside ranking, merging, ...").
    pub fn check(&self) -> Result<(), ObsError> {
        if self.is_cancelled() {
            Err(ObsError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Resolves once the context is cancelled or, if set, once the
    /// deadline elapses — used by the store reader to race fan-out reads
    /// against cancellation (spec §5).
    pub async fn cancelled(&self) {
        let mut rx = self.cancelled.clone();
        let deadline_sleep = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline.into()).await,
                None => std::future::pending().await,
            }
        };
        tokio::select! {
            _ = rx.changed() => {}
            _ = deadline_sleep => {}
        }
    }
}
