//! Channel-backed streams connecting two interpreters.
//!
//! A link is a bounded single-producer, single-consumer FIFO channel. The
//! consuming interpreter blocks on `IN` until a value arrives; the producing
//! interpreter blocks on `OUT` only while the buffer is full. Both ends use
//! the blocking channel API and must run outside the async runtime, e.g.
//! on `tokio::task::spawn_blocking` workers.

use crate::debug;
use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::io::{Input, Output};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::mpsc::{Receiver, Sender, channel};

/// Buffer size used when the caller does not choose one.
pub const DEFAULT_LINK_CAPACITY: usize = 1024;

/// Smallest buffer that still fits a phase plus the driving value.
pub const MIN_LINK_CAPACITY: usize = 2;

/// Errors that can occur while seeding a link before the network starts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LinkError {
    /// Buffer has no room for another preloaded value.
    #[error("link buffer full")]
    Full,
    /// Consumer end was dropped.
    #[error("link closed")]
    Closed,
}

/// Creates a link and returns its producing and consuming ends.
///
/// Capacities below [`MIN_LINK_CAPACITY`] are raised to it.
pub fn link(capacity: usize) -> (LinkOutput, LinkInput) {
    let (tx, rx) = channel(capacity.max(MIN_LINK_CAPACITY));
    (
        LinkOutput {
            tx,
            last: None,
            sent: 0,
        },
        LinkInput { rx },
    )
}

/// Consuming end of a link.
pub struct LinkInput {
    rx: Receiver<i64>,
}

impl Input for LinkInput {
    /// Blocks until the producer sends a value.
    ///
    /// Fails with [`VMError::InputClosed`] once the producer is gone and the
    /// buffer is drained.
    fn read(&mut self) -> Result<i64, VMError> {
        self.rx.blocking_recv().ok_or(VMError::InputClosed)
    }
}

/// Producing end of a link.
///
/// Remembers the last value written by its interpreter so the network can
/// read the final signal even after the consumer has halted.
pub struct LinkOutput {
    tx: Sender<i64>,
    last: Option<i64>,
    sent: u64,
}

impl LinkOutput {
    /// Queues a value without blocking, before any interpreter runs.
    ///
    /// Preloaded values are not counted as output of the producer.
    pub fn preload(&mut self, value: i64) -> Result<(), LinkError> {
        self.tx.try_send(value).map_err(|e| match e {
            TrySendError::Full(_) => LinkError::Full,
            TrySendError::Closed(_) => LinkError::Closed,
        })
    }

    /// Last value written through [`Output::write`].
    pub fn last(&self) -> Option<i64> {
        self.last
    }

    /// Number of values written through [`Output::write`].
    pub fn sent(&self) -> u64 {
        self.sent
    }
}

impl Output for LinkOutput {
    /// Blocks while the buffer is full.
    ///
    /// A consumer that already halted is not an error: the value is recorded
    /// as the last output and dropped.
    fn write(&mut self, value: i64) -> Result<(), VMError> {
        self.last = Some(value);
        self.sent += 1;
        if self.tx.blocking_send(value).is_err() {
            debug!("link consumer gone, dropping {value}");
        }
        Ok(())
    }
}
