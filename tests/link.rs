mod common;

use common::FakeDevice;
use ledlink::{DeviceLink, LinkError, Rgb};
use std::time::{Duration, Instant};
use tokio::net::TcpListener;

/// Bind then drop a listener so the returned port is free
async fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    listener.local_addr().expect("local_addr").port()
}

#[tokio::test]
async fn test_connection_reports_reachability() {
    let device = FakeDevice::start(Rgb::new(0, 0, 0), false).await;
    let link = DeviceLink::with_port(device.host(), device.port());
    assert!(link.test_connection().await);

    let unreachable = DeviceLink::with_port("127.0.0.1", free_port().await);
    assert!(!unreachable.test_connection().await);
}

#[tokio::test]
async fn test_connection_is_bounded_by_connect_timeout() {
    // Non-routable address: either refused outright or bounded by the 1s
    // connect timeout, never longer.
    let link = DeviceLink::with_port("10.255.255.1", 9);
    let start = Instant::now();
    assert!(!link.test_connection().await);
    assert!(start.elapsed() < Duration::from_millis(1800));
}

#[tokio::test]
async fn color_round_trips_exactly() {
    let device = FakeDevice::start(Rgb::new(1, 2, 3), true).await;
    let link = DeviceLink::with_port(device.host(), device.port());

    assert_eq!(link.get_color().await.unwrap(), Rgb::new(1, 2, 3));

    for color in [Rgb::new(0, 0, 0), Rgb::new(255, 255, 255), Rgb::new(17, 130, 201)] {
        link.set_color(color).await.unwrap();
        assert_eq!(device.color(), color);
        assert_eq!(link.get_color().await.unwrap(), color);
    }
}

#[tokio::test]
async fn power_round_trips() {
    let device = FakeDevice::start(Rgb::new(0, 0, 0), false).await;
    let link = DeviceLink::with_port(device.host(), device.port());

    for on in [true, false, true] {
        link.set_on(on).await.unwrap();
        assert_eq!(device.on(), on);
        assert_eq!(link.get_on().await.unwrap(), on);
    }
}

#[tokio::test]
async fn set_requires_exact_ok() {
    let device = FakeDevice::start(Rgb::new(0, 0, 0), false).await;
    let link = DeviceLink::with_port(device.host(), device.port());

    for rigged in ["ERR", "ok", ""] {
        device.reject_sets(rigged);
        let err = link.set_color(Rgb::new(1, 2, 3)).await.unwrap_err();
        assert!(
            matches!(err, LinkError::InvalidResponse(_)),
            "unexpected error for response {rigged:?}: {err}"
        );
        assert!(!err.is_connectivity());
    }
}

#[tokio::test]
async fn malformed_color_is_a_protocol_error() {
    let device = FakeDevice::start(Rgb::new(0, 0, 0), false).await;
    device.rig_color_response("not a color");
    let link = DeviceLink::with_port(device.host(), device.port());

    let err = link.get_color().await.unwrap_err();
    assert!(matches!(err, LinkError::InvalidResponse(_)));
}

#[tokio::test]
async fn out_of_range_color_is_accepted() {
    let device = FakeDevice::start(Rgb::new(0, 0, 0), false).await;
    device.rig_color_response("10, 20, 300");
    let link = DeviceLink::with_port(device.host(), device.port());

    // The controller never range-checks; the over-range component clamps
    assert_eq!(link.get_color().await.unwrap(), Rgb::new(10, 20, 255));
}

#[tokio::test]
async fn refused_connection_is_a_connectivity_error() {
    let link = DeviceLink::with_port("127.0.0.1", free_port().await);
    let err = link.get_color().await.unwrap_err();
    assert!(err.is_connectivity(), "expected connectivity error, got {err}");
}
