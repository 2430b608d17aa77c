use std::net::{TcpListener, TcpStream};
use std::time::Duration;

use failfast::{conditioner, Error, FailFastDialer, DEFAULT_TIMEOUT};

fn loopback() -> (TcpListener, TcpStream) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Binding failed");
    let stream = TcpStream::connect(listener.local_addr().unwrap()).expect("Connecting failed");
    (listener, stream)
}

#[test]
fn capability() {
    assert_eq!(conditioner::is_supported(), cfg!(target_os = "linux"));
}

#[test]
fn invalid_timeouts() {
    let (_listener, stream) = loopback();

    for &timeout in &[Duration::from_secs(0), Duration::from_micros(10)] {
        match conditioner::arm(&stream, timeout) {
            Err(Error::InvalidTimeout(got)) => assert_eq!(got, timeout),
            other => panic!("Expected an invalid timeout for {:?}, got {:?}", timeout, other),
        }
    }

    let too_long = Duration::from_millis(u64::from(u32::MAX) + 1);
    assert!(matches!(conditioner::arm(&stream, too_long), Err(Error::InvalidTimeout(_))));
}

#[cfg(target_os = "linux")]
#[test]
fn arm_loopback() {
    let (_listener, stream) = loopback();
    assert_eq!(conditioner::armed_timeout(&stream).unwrap(), None);

    conditioner::arm(&stream, Duration::from_secs(5)).expect("Arming failed");
    assert_eq!(conditioner::armed_timeout(&stream).unwrap(), Some(Duration::from_secs(5)));

    // Sub-millisecond parts are truncated.
    conditioner::arm(&stream, Duration::from_micros(2_500)).expect("Arming failed");
    assert_eq!(conditioner::armed_timeout(&stream).unwrap(), Some(Duration::from_millis(2)));
}

#[cfg(not(target_os = "linux"))]
#[test]
fn arm_unsupported() {
    let (_listener, stream) = loopback();
    assert!(matches!(conditioner::arm(&stream, Duration::from_secs(5)), Err(Error::Unsupported)));
}

#[cfg(target_os = "linux")]
#[test]
fn dialer_default_timeout() {
    let (listener, _) = loopback();
    let dialer = FailFastDialer::default();
    assert_eq!(dialer.timeout(), DEFAULT_TIMEOUT);

    let stream = dialer.dial(listener.local_addr().unwrap()).expect("Dialing failed");
    assert_eq!(conditioner::armed_timeout(&stream).unwrap(), Some(DEFAULT_TIMEOUT));
}

#[cfg(target_os = "linux")]
#[test]
fn dialer_condition_existing() {
    let (_listener, stream) = loopback();
    let dialer = FailFastDialer::new(Duration::from_secs(3)).with_nodelay(true);

    dialer.condition(&stream).expect("Conditioning failed");
    assert_eq!(conditioner::armed_timeout(&stream).unwrap(), Some(Duration::from_secs(3)));
    assert!(stream.nodelay().unwrap());
}

#[test]
fn dial_refused() {
    // Bind and drop to find a port that is very likely closed.
    let addr = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap();
    let dialer = FailFastDialer::new(Duration::from_secs(1))
        .with_connect_timeout(Duration::from_secs(1));

    match dialer.dial(addr) {
        Err(Error::Io(err)) => assert_eq!(err.kind(), std::io::ErrorKind::ConnectionRefused),
        other => panic!("Expected a refused connection, got {:?}", other),
    }
}
