#![cfg(feature = "test")]

use std::sync::Arc;

use faultline::test::TestTransport;
use faultline::{ClientOptions, RawCapture, RawException};

#[test]
fn test_guard_drains_on_drop() {
    let transport = TestTransport::new();
    let guard = faultline::init(ClientOptions {
        api_key: Some("0123456789abcdef".into()),
        transport: Some(Arc::new(transport.clone())),
        session_flush_interval: None,
        ..Default::default()
    });
    assert!(guard.is_enabled());

    let client = guard.client().clone();
    client.start_session();
    for idx in 0..3 {
        client.capture(RawCapture::new(RawException::new(
            "IoError",
            format!("failure #{}", idx),
        )));
    }
    drop(guard);

    let tasks = transport.fetch_and_clear_tasks();
    assert_eq!(tasks.len(), 4);
    assert!(!client.capture(RawCapture::new(RawException::new("IoError", "late"))));
}

#[test]
fn test_defaults_do_not_override_explicit_options() {
    let transport = TestTransport::new();
    let guard = faultline::init(ClientOptions {
        api_key: Some("0123456789abcdef".into()),
        release_stage: Some("canary".into()),
        hostname: Some("worker-7".into()),
        transport: Some(Arc::new(transport.clone())),
        session_flush_interval: None,
        ..Default::default()
    });
    guard
        .client()
        .capture(RawCapture::new(RawException::new("IoError", "disk full")));
    drop(guard);

    let notifications = transport.fetch_and_clear_notifications();
    let event = &notifications[0].events[0];
    assert_eq!(event.app.release_stage.as_deref(), Some("canary"));
    assert_eq!(event.device.hostname.as_deref(), Some("worker-7"));
}
