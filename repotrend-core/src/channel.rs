//! Local channels for inter-stage communication.
//!
//! Uses crossbeam-channel for bounded, backpressure-aware communication
//! between pipeline stages running in different threads. When a channel is
//! full, `send` blocks, which propagates pressure upstream all the way to
//! the source instead of dropping data.

use crate::types::StreamElement;
use anyhow::{anyhow, Result};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

/// Default channel buffer size (bounded for backpressure).
const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Sender side of a local channel.
#[derive(Clone)]
pub struct LocalChannelSender<T> {
    sender: Sender<StreamElement<T>>,
}

impl<T> LocalChannelSender<T> {
    /// Send a stream element to the channel.
    ///
    /// Blocks if the channel is full (backpressure).
    pub fn send(&self, element: StreamElement<T>) -> Result<()> {
        self.sender
            .send(element)
            .map_err(|_| anyhow!("channel closed: receiver dropped"))
    }
}

/// Receiver side of a local channel.
pub struct LocalChannelReceiver<T> {
    receiver: Receiver<StreamElement<T>>,
}

impl<T> LocalChannelReceiver<T> {
    /// Receive the next stream element, blocking until one is available.
    pub fn recv(&self) -> Result<StreamElement<T>> {
        self.receiver
            .recv()
            .map_err(|_| anyhow!("channel closed: sender dropped"))
    }

    /// Receive with a timeout.
    ///
    /// Returns `Ok(None)` on timeout, which the worker loops use as their
    /// processing-time tick. A closed channel is an error.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<StreamElement<T>>> {
        match self.receiver.recv_timeout(timeout) {
            Ok(elem) => Ok(Some(elem)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => {
                Err(anyhow!("channel closed: sender dropped"))
            }
        }
    }
}

/// Create a bounded local channel pair with the given capacity.
pub fn local_channel<T>(capacity: usize) -> (LocalChannelSender<T>, LocalChannelReceiver<T>) {
    let (sender, receiver) = bounded(capacity);
    (
        LocalChannelSender { sender },
        LocalChannelReceiver { receiver },
    )
}

/// Create a local channel with default capacity.
pub fn local_channel_default<T>() -> (LocalChannelSender<T>, LocalChannelReceiver<T>) {
    local_channel(DEFAULT_CHANNEL_CAPACITY)
}
