// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for topic delivery over the bus and over TCP

use depthpub::backends::camera::{DepthCamera, SimulatedCamera};
use depthpub::errors::TransportError;
use depthpub::pipeline::{StopSignal, launch};
use depthpub::transport::{TcpTopicClient, TcpTopicServer, TopicBus};
use depthpub::{Config, Publisher};
use std::thread;
use std::time::{Duration, Instant};

fn limited(frames: u64) -> Config {
    Config {
        max_frames: Some(frames),
        ..Config::default()
    }
}

fn simulated(
    camera: &depthpub::backends::camera::CameraConfig,
) -> depthpub::errors::DeviceResult<Box<dyn DepthCamera>> {
    Ok(Box::new(SimulatedCamera::open(camera)?))
}

fn wait_for_subscribers(server: &TcpTopicServer, count: usize) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while server.subscriber_count() < count {
        assert!(Instant::now() < deadline, "subscribers never connected");
        thread::sleep(Duration::from_millis(10));
    }
}

#[test]
fn test_tcp_subscriber_receives_frames() {
    let server = TcpTopicServer::bind("127.0.0.1:0", "quad/depth", 16).unwrap();
    let mut client = TcpTopicClient::connect(server.local_addr()).unwrap();
    client.set_read_timeout(Some(Duration::from_secs(10))).unwrap();
    wait_for_subscribers(&server, 1);

    let stats = launch(limited(3), simulated, Box::new(server), &StopSignal::new()).unwrap();
    assert_eq!(stats.frames_published, 3);

    for seq in 1..=3 {
        let (topic, msg) = client.recv().unwrap();
        assert_eq!(topic, "quad/depth");
        assert_eq!(msg.seq, seq);
        assert_eq!(msg.data.len(), 672 * 376);
        assert_eq!((msg.width(), msg.height()), (672, 376));
    }
}

#[test]
fn test_tcp_fan_out_to_every_subscriber() {
    let server = TcpTopicServer::bind("127.0.0.1:0", "quad/depth", 16).unwrap();
    let mut clients: Vec<TcpTopicClient> = (0..2)
        .map(|_| TcpTopicClient::connect(server.local_addr()).unwrap())
        .collect();
    wait_for_subscribers(&server, 2);

    launch(limited(2), simulated, Box::new(server), &StopSignal::new()).unwrap();

    let mut payloads = Vec::new();
    for client in &mut clients {
        client.set_read_timeout(Some(Duration::from_secs(10))).unwrap();
        let (_, first) = client.recv().unwrap();
        let (_, second) = client.recv().unwrap();
        assert_eq!((first.seq, second.seq), (1, 2));
        payloads.push(first.data);
    }
    assert_eq!(payloads[0], payloads[1]);
}

#[test]
fn test_bind_conflict_reported() {
    let server = TcpTopicServer::bind("127.0.0.1:0", "quad/depth", 4).unwrap();
    let addr = server.local_addr().to_string();

    let err = TcpTopicServer::bind(&addr, "quad/depth", 4).err().unwrap();
    assert!(matches!(err, TransportError::Bind { .. }));
}

#[test]
fn test_stream_ends_after_server_shutdown() {
    let mut server = TcpTopicServer::bind("127.0.0.1:0", "quad/depth", 4).unwrap();
    let mut client = TcpTopicClient::connect(server.local_addr()).unwrap();
    client.set_read_timeout(Some(Duration::from_secs(10))).unwrap();
    wait_for_subscribers(&server, 1);

    server.shutdown();
    drop(server);

    assert!(client.recv().is_err());
}

#[test]
fn test_lagging_subscriber_keeps_newest() {
    let bus = TopicBus::new("quad/depth", 4);
    let mut sub = bus.subscribe();

    launch(limited(10), simulated, Box::new(bus.clone()), &StopSignal::new()).unwrap();

    let received: Vec<u64> = std::iter::from_fn(|| sub.try_recv().unwrap())
        .map(|m| m.seq)
        .collect();
    assert_eq!(received, vec![7, 8, 9, 10]);
    assert_eq!(sub.dropped(), 6);
    assert_eq!(bus.published(), 10);
}
