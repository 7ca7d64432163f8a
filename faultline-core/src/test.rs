//! This provides testing functionality for building tests.
//!
//! **Feature:** `test` (*disabled by default*)
//!
//! If the crate has been compiled with the test support feature this module
//! becomes available.  It provides transports that record what they are
//! asked to deliver and helpers to run a client against them.
//!
//! # Example usage
//!
//! ```
//! use faultline_core::test::with_captured_notifications;
//! use faultline_core::{ClientOptions, RawCapture, RawException};
//!
//! let notifications = with_captured_notifications(ClientOptions::default(), |client| {
//!     client.capture(RawCapture::new(RawException::new("IoError", "disk full")));
//! });
//! assert_eq!(notifications.len(), 1);
//! assert_eq!(notifications[0].events[0].exceptions[0].error_class, "IoError");
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crate::protocol::{Notification, SessionPayload};
use crate::utils::lock;
use crate::{Client, ClientOptions, DeliveryError, DeliveryTask, PayloadKind, Transport};

const TEST_API_KEY: &str = "0123456789abcdef0123456789abcdef";

/// Collects delivery tasks instead of sending them.
///
/// # Examples
///
/// ```
/// use faultline_core::test::TestTransport;
/// use faultline_core::{Client, ClientOptions};
/// use std::sync::Arc;
///
/// let transport = TestTransport::new();
/// let options = ClientOptions {
///     api_key: Some("0123456789abcdef".into()),
///     transport: Some(Arc::new(transport.clone())),
///     ..ClientOptions::default()
/// };
/// let client = Client::from(options);
/// ```
pub struct TestTransport {
    collected: Mutex<Vec<DeliveryTask>>,
}

impl TestTransport {
    /// Creates a new test transport.
    #[allow(clippy::new_ret_no_self)]
    pub fn new() -> Arc<TestTransport> {
        Arc::new(TestTransport {
            collected: Mutex::new(vec![]),
        })
    }

    /// Fetches and clears the delivered tasks.
    pub fn fetch_and_clear_tasks(&self) -> Vec<DeliveryTask> {
        std::mem::take(&mut *lock(&self.collected))
    }

    /// Fetches and clears the delivered tasks, decoding the notifications.
    ///
    /// Session payloads are discarded.
    pub fn fetch_and_clear_notifications(&self) -> Vec<Notification> {
        decode_all(self.fetch_and_clear_tasks(), PayloadKind::Event)
    }

    /// Fetches and clears the delivered tasks, decoding the session payloads.
    ///
    /// Notifications are discarded.
    pub fn fetch_and_clear_sessions(&self) -> Vec<SessionPayload> {
        decode_all(self.fetch_and_clear_tasks(), PayloadKind::Session)
    }
}

impl Transport for TestTransport {
    fn deliver(&self, task: &DeliveryTask) -> Result<(), DeliveryError> {
        lock(&self.collected).push(task.clone());
        Ok(())
    }
}

fn decode_all<T>(tasks: Vec<DeliveryTask>, kind: PayloadKind) -> Vec<T>
where
    T: serde::de::DeserializeOwned,
{
    tasks
        .into_iter()
        .filter(|task| task.kind == kind)
        .map(|task| serde_json::from_slice(&task.payload).expect("payload is valid json"))
        .collect()
}

/// A transport that takes a fixed amount of time per delivery.
///
/// Useful to exercise shutdown with a grace period.
pub struct BlockingTransport {
    delay: Duration,
    delivered: AtomicUsize,
}

impl BlockingTransport {
    /// Creates a transport that sleeps for `delay` on every delivery.
    #[allow(clippy::new_ret_no_self)]
    pub fn new(delay: Duration) -> Arc<BlockingTransport> {
        Arc::new(BlockingTransport {
            delay,
            delivered: AtomicUsize::new(0),
        })
    }

    /// How many deliveries completed.
    pub fn delivered(&self) -> usize {
        self.delivered.load(Ordering::SeqCst)
    }
}

impl Transport for BlockingTransport {
    fn deliver(&self, _task: &DeliveryTask) -> Result<(), DeliveryError> {
        thread::sleep(self.delay);
        self.delivered.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// A transport that fails every delivery.
pub struct FailingTransport {
    panics: bool,
    attempts: AtomicUsize,
}

impl FailingTransport {
    /// Creates a transport that returns an error on every delivery.
    #[allow(clippy::new_ret_no_self)]
    pub fn new() -> Arc<FailingTransport> {
        Arc::new(FailingTransport {
            panics: false,
            attempts: AtomicUsize::new(0),
        })
    }

    /// Creates a transport that panics on every delivery.
    pub fn panicking() -> Arc<FailingTransport> {
        Arc::new(FailingTransport {
            panics: true,
            attempts: AtomicUsize::new(0),
        })
    }

    /// How many deliveries were attempted.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl Transport for FailingTransport {
    fn deliver(&self, _task: &DeliveryTask) -> Result<(), DeliveryError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.panics {
            panic!("transport exploded");
        }
        Err(DeliveryError::Status(503))
    }
}

/// Runs some code against a client with the given options and returns the
/// captured notifications.
///
/// If no api key is set on the options a test key is inserted.  The
/// transport is overridden with a [`TestTransport`] and the background
/// session flusher is disabled.  Pending deliveries are flushed before the
/// notifications are returned.
pub fn with_captured_notifications<F: FnOnce(&Client)>(
    options: ClientOptions,
    f: F,
) -> Vec<Notification> {
    let transport = run_with_test_transport(options, f);
    transport.fetch_and_clear_notifications()
}

/// Like [`with_captured_notifications`] but returns the session payloads.
///
/// The client is stopped before returning, so every session window with
/// activity is included.
pub fn with_captured_sessions<F: FnOnce(&Client)>(
    options: ClientOptions,
    f: F,
) -> Vec<SessionPayload> {
    let transport = run_with_test_transport(options, f);
    transport.fetch_and_clear_sessions()
}

fn run_with_test_transport<F: FnOnce(&Client)>(
    mut options: ClientOptions,
    f: F,
) -> Arc<TestTransport> {
    let transport = TestTransport::new();
    options.api_key = Some(options.api_key.unwrap_or(TEST_API_KEY.into()));
    options.transport = Some(Arc::new(transport.clone()));
    options.session_transport = None;
    options.session_flush_interval = None;
    let client = Client::from(options);
    f(&client);
    client.stop(Some(Duration::from_secs(5)));
    transport
}
