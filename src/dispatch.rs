//! Callback delivery contexts
//!
//! Progress and completion callbacks never run on the transfer worker
//! directly. They are handed to a [`Dispatcher`], which decides where they
//! run. Two implementations are provided:
//!
//! - [`InlineDispatcher`] runs the callback immediately on the calling task.
//!   Fine for consumers that are already thread-safe.
//! - [`ChannelDispatcher`] queues callbacks onto a FIFO channel. The consumer
//!   owns the matching [`DispatchQueue`] and drains it on its own thread (a
//!   UI loop, the CLI main thread), so its state is only ever touched from
//!   one place and callbacks run in the order they were dispatched.

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use log::trace;
use std::time::Duration;

/// A unit of work queued for the consumer's context
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Delivers callbacks onto the consumer's execution context
pub trait Dispatcher: Send + Sync {
    fn dispatch(&self, task: Task);
}

/// Runs callbacks immediately
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineDispatcher;

impl Dispatcher for InlineDispatcher {
    fn dispatch(&self, task: Task) {
        task();
    }
}

/// Queues callbacks for a [`DispatchQueue`]
#[derive(Clone)]
pub struct ChannelDispatcher {
    tx: Sender<Task>,
}

impl ChannelDispatcher {
    /// Create a dispatcher and the queue its callbacks are delivered to
    pub fn new() -> (Self, DispatchQueue) {
        let (tx, rx) = unbounded();
        (Self { tx }, DispatchQueue { rx })
    }
}

impl Dispatcher for ChannelDispatcher {
    fn dispatch(&self, task: Task) {
        if self.tx.send(task).is_err() {
            trace!("Dispatch queue dropped; callback discarded");
        }
    }
}

/// Consumer side of a [`ChannelDispatcher`]
pub struct DispatchQueue {
    rx: Receiver<Task>,
}

impl DispatchQueue {
    /// Run every callback queued so far without blocking.
    ///
    /// Returns the number of callbacks run.
    pub fn run_pending(&self) -> usize {
        let mut count = 0;
        loop {
            match self.rx.try_recv() {
                Ok(task) => {
                    task();
                    count += 1;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return count,
            }
        }
    }

    /// Wait up to `timeout` for one callback and run it.
    ///
    /// Returns `false` on timeout or when every dispatcher is gone.
    pub fn run_next_timeout(&self, timeout: Duration) -> bool {
        match self.rx.recv_timeout(timeout) {
            Ok(task) => {
                task();
                true
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => false,
        }
    }

    /// Run callbacks until every dispatcher has been dropped.
    pub fn run_until_closed(&self) -> usize {
        let mut count = 0;
        while let Ok(task) = self.rx.recv() {
            task();
            count += 1;
        }
        count
    }
}
