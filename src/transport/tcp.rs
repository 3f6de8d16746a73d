// SPDX-License-Identifier: GPL-3.0-only

//! Topic served over TCP
//!
//! The server wraps a [`TopicBus`]. Every accepted connection becomes a bus
//! subscriber drained by its own writer thread, so a slow peer only ever
//! loses its own oldest messages and never stalls the publisher.

use super::bus::{Subscription, TopicBus};
use super::{DepthArray, Publisher, wire};
use crate::constants::ACCEPT_POLL_INTERVAL;
use crate::errors::{TransportError, TransportResult};
use std::io::{BufReader, BufWriter, ErrorKind};
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

/// TCP topic server
pub struct TcpTopicServer {
    bus: TopicBus,
    local_addr: SocketAddr,
    running: Arc<AtomicBool>,
    accept_handle: Option<JoinHandle<()>>,
}

impl TcpTopicServer {
    /// Bind `addr` and start accepting subscribers for `topic`
    pub fn bind(addr: &str, topic: &str, queue_size: usize) -> TransportResult<Self> {
        let bind_error = |e: std::io::Error| TransportError::Bind {
            addr: addr.to_string(),
            reason: e.to_string(),
        };

        let listener = TcpListener::bind(addr).map_err(bind_error)?;
        listener.set_nonblocking(true).map_err(bind_error)?;
        let local_addr = listener.local_addr().map_err(bind_error)?;

        let bus = TopicBus::new(topic, queue_size);
        let running = Arc::new(AtomicBool::new(true));

        info!(addr = %local_addr, topic, queue_size, "Topic server listening");

        let accept_bus = bus.clone();
        let accept_running = Arc::clone(&running);
        let accept_handle = thread::Builder::new()
            .name("topic-accept".to_string())
            .spawn(move || accept_loop(listener, accept_bus, accept_running))
            .map_err(|e| TransportError::Io(e.to_string()))?;

        Ok(Self {
            bus,
            local_addr,
            running,
            accept_handle: Some(accept_handle),
        })
    }

    /// Address actually bound (useful with port 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting connections and wait for the accept thread
    pub fn shutdown(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.accept_handle.take()
            && handle.join().is_err()
        {
            warn!("Topic accept thread panicked");
        }
    }
}

impl Publisher for TcpTopicServer {
    fn topic(&self) -> &str {
        self.bus.topic()
    }

    fn publish(&mut self, msg: &DepthArray) -> TransportResult<()> {
        self.bus.publish(msg)
    }

    fn subscriber_count(&self) -> usize {
        self.bus.subscriber_count()
    }
}

impl Drop for TcpTopicServer {
    fn drop(&mut self) {
        debug!(addr = %self.local_addr, "Topic server dropped");
        self.shutdown();
    }
}

fn accept_loop(listener: TcpListener, bus: TopicBus, running: Arc<AtomicBool>) {
    while running.load(Ordering::SeqCst) {
        match listener.accept() {
            Ok((stream, peer)) => {
                // Subscribe before spawning so no message published after
                // accept() returns is missed
                let subscription = bus.subscribe();
                info!(peer = %peer, topic = %subscription.topic(), "Subscriber connected");

                let spawned = thread::Builder::new()
                    .name(format!("topic-writer-{}", peer))
                    .spawn(move || writer_loop(stream, peer, subscription));
                if let Err(e) = spawned {
                    warn!(peer = %peer, error = %e, "Could not start subscriber writer");
                }
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => thread::sleep(ACCEPT_POLL_INTERVAL),
            Err(e) => {
                warn!(error = %e, "Accept failed");
                thread::sleep(ACCEPT_POLL_INTERVAL);
            }
        }
    }
    debug!("Topic accept loop ended");
}

fn writer_loop(stream: TcpStream, peer: SocketAddr, mut subscription: Subscription) {
    // Accepted sockets may inherit non-blocking mode from the listener
    if let Err(e) = stream.set_nonblocking(false) {
        warn!(peer = %peer, error = %e, "Could not switch socket to blocking mode");
        return;
    }
    if let Err(e) = stream.set_nodelay(true) {
        debug!(peer = %peer, error = %e, "Could not disable Nagle on subscriber socket");
    }
    let topic = subscription.topic().to_string();
    let mut writer = BufWriter::new(stream);

    loop {
        let msg = match subscription.recv_blocking() {
            Ok(msg) => msg,
            Err(_) => break,
        };
        if let Err(e) = wire::write_frame(&mut writer, &topic, &msg) {
            info!(peer = %peer, error = %e, "Subscriber disconnected");
            return;
        }
    }

    debug!(peer = %peer, dropped = subscription.dropped(), "Subscriber writer finished");
}

/// Client side of a TCP topic
pub struct TcpTopicClient {
    reader: BufReader<TcpStream>,
}

impl TcpTopicClient {
    /// Connect to a topic server
    pub fn connect<A: ToSocketAddrs>(addr: A) -> TransportResult<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        Ok(Self {
            reader: BufReader::new(stream),
        })
    }

    /// Give up on `recv` after `timeout` without data
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> TransportResult<()> {
        self.reader.get_ref().set_read_timeout(timeout)?;
        Ok(())
    }

    /// Block until the next message arrives
    pub fn recv(&mut self) -> TransportResult<(String, DepthArray)> {
        wire::read_frame(&mut self.reader)
    }
}
