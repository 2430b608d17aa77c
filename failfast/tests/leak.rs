//! Conditioning must not leave descriptors behind.
//!
//! This is a test binary of its own since any concurrently running test would change the count.
#![cfg(target_os = "linux")]
use std::fs;
use std::net::TcpListener;
use std::time::Duration;

use failfast::FailFastDialer;

fn count_fds() -> usize {
    fs::read_dir("/proc/self/fd")
        .expect("Listing descriptors failed")
        .count()
}

#[test]
fn no_descriptor_leak() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Binding failed");
    let addr = listener.local_addr().unwrap();
    let dialer = FailFastDialer::new(Duration::from_secs(5)).with_nodelay(true);

    // Warm up anything lazily allocated by the first connection.
    drop(dialer.dial(addr).expect("Dialing failed"));
    drop(listener.accept().expect("Accepting failed"));

    let before = count_fds();
    for _ in 0..16 {
        let stream = dialer.dial(addr).expect("Dialing failed");
        let (accepted, _) = listener.accept().expect("Accepting failed");
        drop(stream);
        drop(accepted);
    }
    let after = count_fds();

    assert_eq!(before, after, "File descriptors leaked");
}
