// SPDX-License-Identifier: GPL-3.0-only

//! In-process topic bus
//!
//! Backed by a [`tokio::sync::broadcast`] channel used as a software bus:
//! every subscriber sees every message, and the channel's ring buffer bounds
//! how far a subscriber may fall behind. No async runtime is needed.

use super::{DepthArray, Publisher};
use crate::constants::MAX_QUEUE_SIZE;
use crate::errors::{TransportError, TransportResult};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::{debug, warn};

/// Cloneable handle to one in-process topic
#[derive(Clone)]
pub struct TopicBus {
    topic: Arc<str>,
    sender: broadcast::Sender<Arc<DepthArray>>,
    published: Arc<AtomicU64>,
}

impl TopicBus {
    /// Create a topic retaining up to `queue_size` pending messages per subscriber
    ///
    /// The channel rounds the capacity up to a power of two. Sizes outside
    /// `1..=MAX_QUEUE_SIZE` are clamped into that range.
    pub fn new(topic: &str, queue_size: usize) -> Self {
        let (sender, _) = broadcast::channel(queue_size.clamp(1, MAX_QUEUE_SIZE));
        debug!(topic, queue_size, "Topic bus created");

        Self {
            topic: Arc::from(topic),
            sender,
            published: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Attach a new subscriber; it only sees messages published from now on
    pub fn subscribe(&self) -> Subscription {
        Subscription {
            topic: Arc::clone(&self.topic),
            receiver: self.sender.subscribe(),
            dropped: 0,
        }
    }

    /// Total messages published on this topic
    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }
}

impl Publisher for TopicBus {
    fn topic(&self) -> &str {
        &self.topic
    }

    fn publish(&mut self, msg: &DepthArray) -> TransportResult<()> {
        self.published.fetch_add(1, Ordering::Relaxed);
        // Err only means nobody is subscribed
        let _ = self.sender.send(Arc::new(msg.clone()));
        Ok(())
    }

    fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Receiving end of a topic
pub struct Subscription {
    topic: Arc<str>,
    receiver: broadcast::Receiver<Arc<DepthArray>>,
    dropped: u64,
}

impl Subscription {
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Messages lost because this subscriber fell behind
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Block until the next message arrives
    ///
    /// Must not be called from inside an async runtime.
    pub fn recv_blocking(&mut self) -> TransportResult<Arc<DepthArray>> {
        loop {
            match self.receiver.blocking_recv() {
                Ok(msg) => return Ok(msg),
                Err(RecvError::Lagged(n)) => self.note_lag(n),
                Err(RecvError::Closed) => return Err(TransportError::Closed),
            }
        }
    }

    /// Next pending message, if any
    pub fn try_recv(&mut self) -> TransportResult<Option<Arc<DepthArray>>> {
        loop {
            match self.receiver.try_recv() {
                Ok(msg) => return Ok(Some(msg)),
                Err(TryRecvError::Empty) => return Ok(None),
                Err(TryRecvError::Lagged(n)) => self.note_lag(n),
                Err(TryRecvError::Closed) => return Err(TransportError::Closed),
            }
        }
    }

    fn note_lag(&mut self, n: u64) {
        self.dropped += n;
        warn!(topic = %self.topic, dropped = n, "Subscriber fell behind, oldest messages dropped");
    }
}
