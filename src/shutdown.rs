//! Cooperative shutdown coordination
//!
//! A single watch slot holds the pending shutdown reason. OS signals and the
//! consumption loop itself (on a closed shard) can fill it; the loop only looks
//! at it between batches and during its idle waits, so a batch in progress
//! always runs to completion.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Why the loop was asked to stop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// SIGINT / Ctrl-C
    Interrupt,
    /// SIGTERM
    Terminate,
    /// The shard returned no next iterator
    PartitionClosed,
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownReason::Interrupt => f.write_str("interrupt signal"),
            ShutdownReason::Terminate => f.write_str("terminate signal"),
            ShutdownReason::PartitionClosed => f.write_str("partition closed"),
        }
    }
}

type Slot = watch::Sender<Option<ShutdownReason>>;

/// Fills the slot only if it is empty; the first reason sticks.
fn fill(slot: &Slot, reason: ShutdownReason) -> bool {
    slot.send_if_modified(|pending| {
        if pending.is_some() {
            return false;
        }
        *pending = Some(reason);
        true
    })
}

/// Owns the shutdown slot and the OS signal listener
#[derive(Debug, Clone)]
pub struct ShutdownCoordinator {
    slot: Arc<Slot>,
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { slot: Arc::new(tx) }
    }

    /// A handle for the consumption loop
    pub fn signal(&self) -> ShutdownSignal {
        ShutdownSignal {
            slot: self.slot.clone(),
            rx: self.slot.subscribe(),
        }
    }

    /// Requests shutdown; returns false if one was already pending
    pub fn request(&self, reason: ShutdownReason) -> bool {
        fill(&self.slot, reason)
    }

    /// Spawns a task that requests shutdown on SIGINT or SIGTERM
    pub fn listen_for_signals(&self) -> JoinHandle<()> {
        let slot = self.slot.clone();
        tokio::spawn(async move {
            if let Some(reason) = wait_for_termination().await {
                info!(reason = %reason, "Received termination signal, shutting down after current batch");
                fill(&slot, reason);
            }
        })
    }
}

#[cfg(unix)]
async fn wait_for_termination() -> Option<ShutdownReason> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut term = match signal(SignalKind::terminate()) {
        Ok(term) => term,
        Err(e) => {
            error!(error = %e, "Failed to install SIGTERM handler, listening for SIGINT only");
            return wait_for_interrupt().await;
        }
    };

    tokio::select! {
        reason = wait_for_interrupt() => reason,
        _ = term.recv() => Some(ShutdownReason::Terminate),
    }
}

#[cfg(not(unix))]
async fn wait_for_termination() -> Option<ShutdownReason> {
    wait_for_interrupt().await
}

async fn wait_for_interrupt() -> Option<ShutdownReason> {
    match tokio::signal::ctrl_c().await {
        Ok(()) => Some(ShutdownReason::Interrupt),
        Err(e) => {
            error!(error = %e, "Failed to listen for SIGINT");
            None
        }
    }
}

/// The consumption loop's view of the shutdown slot
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    slot: Arc<Slot>,
    rx: watch::Receiver<Option<ShutdownReason>>,
}

impl ShutdownSignal {
    /// Requests shutdown from inside the loop
    pub fn request(&self, reason: ShutdownReason) -> bool {
        fill(&self.slot, reason)
    }

    pub fn pending(&self) -> Option<ShutdownReason> {
        *self.rx.borrow()
    }

    /// Waits until a shutdown is pending
    pub async fn wait(&mut self) -> ShutdownReason {
        loop {
            if let Some(reason) = *self.rx.borrow_and_update() {
                return reason;
            }
            // The sender lives in `self.slot`, so the channel cannot close.
            if self.rx.changed().await.is_err() {
                return ShutdownReason::Terminate;
            }
        }
    }

    /// Sleeps for `duration` unless shutdown is requested first.
    ///
    /// Returns the pending reason if the sleep was cut short.
    pub async fn sleep(&mut self, duration: Duration) -> Option<ShutdownReason> {
        if let Some(reason) = self.pending() {
            return Some(reason);
        }
        tokio::select! {
            _ = tokio::time::sleep(duration) => {
                debug!(delay_ms = ?duration.as_millis(), "Wait elapsed");
                None
            }
            reason = self.wait() => Some(reason),
        }
    }
}
