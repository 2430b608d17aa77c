//! Connections across the black-hole harness.
//!
//! These need `CAP_NET_ADMIN` and `/dev/net/tun` and are ignored by default, run them with
//! `cargo test -- --ignored`. Every test uses its own subnet so that they can run in parallel.
#![cfg(target_os = "linux")]
use std::io::{Read, Write};
use std::net::{Ipv4Addr, Shutdown, SocketAddr, TcpStream};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use failfast::{conditioner, harness, Error, FailFastDialer};

const TIMEOUT: Duration = Duration::from_secs(5);
const PORT: u16 = 1000;
/// Time for an acknowledgment to cross the interface before the peer is silenced.
const SETTLE: Duration = Duration::from_millis(200);

fn config(name: &str, subnet: u8) -> harness::Config {
    harness::Config::new(Ipv4Addr::new(10, subnet, 0, 10), 24)
        .with_name(name)
}

fn open(config: &harness::Config) -> harness::Interface {
    harness::Interface::open(config.clone())
        .unwrap_or_else(|err| panic!("Opening the harness failed: {}", err))
}

/// Read once on a clone of the stream in the background.
fn read_once(stream: &TcpStream) -> mpsc::Receiver<std::io::Result<usize>> {
    let mut reader = stream.try_clone().expect("Cloning the stream failed");
    let (send, recv) = mpsc::channel();
    thread::spawn(move || {
        let mut buffer = [0; 4096];
        let _ = send.send(reader.read(&mut buffer));
    });
    recv
}

#[test]
#[ignore = "needs CAP_NET_ADMIN and /dev/net/tun"]
fn open_and_close() {
    let interface = open(&config("fftestc%d", 3));

    assert!(interface.name().starts_with("fftestc"));
    assert!(!interface.name().contains('%'));
    assert!(interface.is_running());
    interface.close().expect("Harness failed");
}

/// A frame that does not decode stops the read loop and is reported by `close`.
#[test]
#[ignore = "needs CAP_NET_ADMIN and /dev/net/tun"]
fn undecodable_frame_stops_harness() {
    // Too short for the SYN, which is read truncated.
    let config = config("fftestf%d", 5).with_buffer_len(30);
    let interface = open(&config);

    let peer = SocketAddr::from((config.peer(20), PORT));
    assert!(TcpStream::connect_timeout(&peer, Duration::from_secs(1)).is_err());

    let deadline = Instant::now() + Duration::from_secs(5);
    while interface.is_running() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(10));
    }
    assert!(!interface.is_running(), "Harness kept running after a malformed frame");

    match interface.close() {
        Err(Error::Decode(_)) => (),
        other => panic!("Expected a decode failure, got {:?}", other),
    }
}

#[test]
#[ignore = "needs CAP_NET_ADMIN and /dev/net/tun"]
fn dialer_arms_across_harness() {
    let config = config("fftestd%d", 4);
    let interface = open(&config);

    let dialer = FailFastDialer::new(TIMEOUT)
        .with_connect_timeout(Duration::from_secs(2))
        .with_nodelay(true);
    let stream = dialer.dial((config.peer(20), PORT)).expect("Dialing failed");
    assert_eq!(conditioner::armed_timeout(&stream).unwrap(), Some(TIMEOUT));
    assert!(stream.nodelay().unwrap());

    drop(stream);
    interface.close().expect("Harness failed");
}

/// A silenced peer is detected once the user timeout elapsed.
#[test]
#[ignore = "needs CAP_NET_ADMIN and /dev/net/tun"]
fn fails_fast_when_silenced() {
    let config = config("fftesta%d", 1);
    let interface = open(&config);

    let mut stream = TcpStream::connect((config.peer(20), PORT)).expect("Dialing failed");
    stream.set_nodelay(true).unwrap();
    conditioner::arm(&stream, TIMEOUT).expect("Arming failed");
    stream.write_all(b"foobar\n").unwrap();
    thread::sleep(SETTLE);

    interface.silence().set(true);
    stream.write_all(b"foobar\n").unwrap();
    let start = Instant::now();

    let first = read_once(&stream)
        .recv_timeout(TIMEOUT * 3)
        .expect("Connection was not terminated");
    let elapsed = start.elapsed();
    assert!(elapsed >= TIMEOUT, "Connection dropped after {:?}, before the timeout", elapsed);
    match first {
        Err(err) => assert_eq!(err.kind(), std::io::ErrorKind::TimedOut),
        Ok(len) => assert_eq!(len, 0),
    }

    let mut buffer = [0; 4096];
    assert_eq!(stream.read(&mut buffer).expect("Read after termination failed"), 0);

    drop(stream);
    interface.close().expect("Harness failed");
}

/// Without the user timeout the kernel keeps retransmitting to a silenced peer.
#[test]
#[ignore = "needs CAP_NET_ADMIN and /dev/net/tun"]
fn control_keeps_retransmitting() {
    let config = config("fftestb%d", 2);
    let interface = open(&config);

    let mut stream = TcpStream::connect((config.peer(20), PORT)).expect("Dialing failed");
    stream.set_nodelay(true).unwrap();
    stream.write_all(b"foobar\n").unwrap();
    thread::sleep(SETTLE);

    interface.silence().set(true);
    stream.write_all(b"foobar\n").unwrap();

    let read = read_once(&stream);
    match read.recv_timeout(TIMEOUT * 2) {
        Err(mpsc::RecvTimeoutError::Timeout) => (),
        other => panic!("Control connection terminated early: {:?}", other),
    }

    // Wakes the blocked reader.
    let _ = stream.shutdown(Shutdown::Both);
    drop(stream);
    interface.close().expect("Harness failed");
}
