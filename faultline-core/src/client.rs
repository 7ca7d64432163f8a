use std::error::Error;
use std::fmt;
use std::panic::RefUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use crate::builder::{app_info, attach_current_thread, build_event, device_info};
use crate::callbacks::{run_callbacks, MutationOutcome};
use crate::constants::{API_KEY_HEADER, NOTIFIER_INFO, PAYLOAD_VERSION_HEADER, SENT_AT_HEADER};
use crate::gate::should_capture;
use crate::protocol::{
    Event, Notification, RawCapture, SessionPayload, SessionSnapshot, SessionSummary,
    PAYLOAD_VERSION,
};
use crate::redact::redact_in_place;
use crate::session::{SessionAggregator, SessionFlusher};
use crate::transport::{DeliveryTask, JsonSerializer, PayloadKind, Serializer};
use crate::types::{DateTime, Url, Utc};
use crate::utils::lock;
use crate::worker::{DeliveryWorker, Transports};
use crate::{ClientOptions, Scope};

impl From<ClientOptions> for Client {
    fn from(o: ClientOptions) -> Client {
        Client::with_options(o)
    }
}

/// The faultline Client.
///
/// The client owns the whole pipeline: it gates, builds, mutates and
/// redacts captures on the calling thread, aggregates session counts and
/// hands serialized payloads to its delivery workers.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use faultline_core::test::TestTransport;
/// use faultline_core::{Client, ClientOptions, RawCapture, RawException};
///
/// let transport = TestTransport::new();
/// let client = Client::from(ClientOptions {
///     api_key: Some("0123456789abcdef".into()),
///     transport: Some(Arc::new(transport.clone())),
///     ..Default::default()
/// });
///
/// client.capture(RawCapture::new(RawException::new("IoError", "disk full")));
/// client.flush(None);
/// assert_eq!(transport.fetch_and_clear_notifications().len(), 1);
/// ```
pub struct Client {
    inner: Arc<ClientInner>,
    session_flusher: Mutex<Option<SessionFlusher>>,
}

struct ClientInner {
    options: RwLock<Arc<ClientOptions>>,
    sessions: SessionAggregator,
    worker: DeliveryWorker,
    has_transport: bool,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("options", &self.options())
            .field("pending_tasks", &self.pending_task_count())
            .finish()
    }
}

impl Client {
    /// Creates a new client for the given options.
    ///
    /// Transports are created once, here.  If no event transport is
    /// configured the client is disabled.
    pub fn with_options(options: ClientOptions) -> Client {
        faultline_debug!(debug: options.debug; "creating client with options: {:?}", options);

        let events = options
            .transport
            .as_ref()
            .map(|factory| factory.create_transport(&options));
        let sessions = match options.session_transport {
            Some(ref factory) => Some(factory.create_transport(&options)),
            None => events.clone(),
        };
        if events.is_none() {
            faultline_debug!(debug: options.debug; "no transport configured, client is disabled");
        }

        let has_transport = events.is_some();
        let worker = DeliveryWorker::new(
            options.worker_count,
            Transports { events, sessions },
            options.debug,
        );
        let flush_interval = options.session_flush_interval;

        let inner = Arc::new(ClientInner {
            options: RwLock::new(Arc::new(options)),
            sessions: SessionAggregator::new(),
            worker,
            has_transport,
        });

        let session_flusher = flush_interval.map(|interval| {
            let inner = inner.clone();
            SessionFlusher::new(interval, move |now| inner.tick(now))
        });

        Client {
            inner,
            session_flusher: Mutex::new(session_flusher),
        }
    }

    /// Returns the current options snapshot of this client.
    pub fn options(&self) -> Arc<ClientOptions> {
        self.inner.options()
    }

    /// Replaces the options snapshot.
    ///
    /// The new options apply to captures and session flushes that start
    /// afterwards.  Transports, worker count and flush interval are fixed
    /// when the client is created and are not affected.
    pub fn configure<F>(&self, f: F)
    where
        F: FnOnce(&mut ClientOptions),
    {
        let mut options = ClientOptions::clone(&self.options());
        f(&mut options);
        self.inner.worker.set_debug(options.debug);
        *self
            .inner
            .options
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Arc::new(options);
    }

    /// Quick check to see if the client is enabled.
    ///
    /// The client is enabled if it has an api key and a transport.
    pub fn is_enabled(&self) -> bool {
        self.inner.has_transport && self.options().api_key.is_some()
    }

    /// Runs the capture gate on a capture with the current options.
    pub fn should_capture(&self, capture: &RawCapture) -> bool {
        should_capture(capture, &self.options())
    }

    /// Captures an error and queues it for delivery.
    ///
    /// This never blocks on I/O.  Returns `true` if an event was queued.
    pub fn capture(&self, capture: RawCapture) -> bool {
        self.capture_with_scope(capture, None)
    }

    /// Captures an error with additional context.
    pub fn capture_with_scope(&self, capture: RawCapture, scope: Option<&Scope>) -> bool {
        let options = self.options();
        if !self.inner.has_transport {
            faultline_debug!(debug: options.debug; "client is disabled, not capturing");
            return false;
        }
        match self.prepare_with(capture, scope, &options) {
            Some(event) => self.inner.enqueue_event(event, &options),
            None => false,
        }
    }

    /// Captures any `std::error::Error` as a handled error.
    pub fn capture_error<E: Error + ?Sized>(&self, error: &E) -> bool {
        self.capture(RawCapture::from_error(error))
    }

    /// Runs a capture through the pipeline without delivering it.
    ///
    /// Returns `None` if the capture was gated or suppressed by a callback.
    /// The active session is updated as if the event had been delivered.
    pub fn prepare_event(&self, capture: RawCapture, scope: Option<&Scope>) -> Option<Event> {
        self.prepare_with(capture, scope, &self.options())
    }

    fn prepare_with(
        &self,
        capture: RawCapture,
        scope: Option<&Scope>,
        options: &ClientOptions,
    ) -> Option<Event> {
        if !should_capture(&capture, options) {
            return None;
        }

        let capture = attach_current_thread(capture, options);
        let mut draft = build_event(capture, options, self.inner.sessions.current_session());
        if let Some(scope) = scope {
            scope.apply_to_draft(&mut draft);
        }
        if run_callbacks(&mut draft, &options.callbacks) == MutationOutcome::Suppress {
            return None;
        }
        redact_in_place(&mut draft.metadata, &options.filters);

        let handled = draft.handled();
        let timestamp = draft.timestamp();
        let mut event = draft.freeze();
        if event.session.is_some() {
            if let Some(session) = self.inner.sessions.record(timestamp, handled) {
                event.session = Some(session);
            }
        }
        Some(event)
    }

    /// Starts a new session.
    pub fn start_session(&self) -> SessionSnapshot {
        let session = self.inner.sessions.start_session(Utc::now());
        faultline_debug!(debug: self.options().debug; "started session {}", session.id);
        session
    }

    /// The active session, if any.
    pub fn current_session(&self) -> Option<SessionSnapshot> {
        self.inner.sessions.current_session()
    }

    /// Flushes every session window that closed before `now`.
    ///
    /// This is called periodically by the background flusher.
    pub fn tick(&self, now: DateTime<Utc>) {
        self.inner.tick(now);
    }

    /// Drains all pending deliveries without shutting down.
    ///
    /// Returns `false` if the timeout elapsed first.  If no timeout is
    /// given, `shutdown_timeout` from the options is used.
    pub fn flush(&self, timeout: Option<Duration>) -> bool {
        let options = self.options();
        let timeout = timeout.unwrap_or(options.shutdown_timeout);
        faultline_debug!(
            debug: options.debug;
            "flushing pending deliveries (timeout: {:?})",
            timeout
        );
        self.inner.worker.flush(timeout)
    }

    /// Flushes all sessions, then stops the delivery workers.
    ///
    /// Pending deliveries get at most `timeout` (or `shutdown_timeout` from
    /// the options) to complete.  Returns how many payloads were abandoned.
    /// After stopping, the client no longer delivers anything.
    pub fn stop(&self, timeout: Option<Duration>) -> usize {
        let options = self.options();
        let grace = timeout.unwrap_or(options.shutdown_timeout);
        faultline_debug!(debug: options.debug; "stopping client (grace period: {:?})", grace);
        drop(lock(&self.session_flusher).take());
        self.inner.flush_sessions(self.inner.sessions.take_all());
        self.inner.worker.stop(grace)
    }

    /// Synchronously flushes the session windows that closed before `now`.
    ///
    /// Returns the payload that was queued, if any window had activity.
    pub fn flush_now(&self, now: DateTime<Utc>) -> Option<SessionPayload> {
        self.inner.flush_sessions(self.inner.sessions.take_closed(now))
    }

    /// The number of payloads queued or being delivered.
    pub fn pending_task_count(&self) -> usize {
        self.inner.worker.pending()
    }
}

impl ClientInner {
    fn options(&self) -> Arc<ClientOptions> {
        self.options
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn tick(&self, now: DateTime<Utc>) {
        self.flush_sessions(self.sessions.take_closed(now));
    }

    fn enqueue_event(&self, event: Event, options: &ClientOptions) -> bool {
        let api_key = match event.api_key.as_deref().or(options.api_key.as_deref()) {
            Some(api_key) => api_key.to_owned(),
            None => {
                faultline_debug!(debug: options.debug; "no api key configured, dropping event");
                return false;
            }
        };
        let notification = Notification {
            api_key,
            notifier: NOTIFIER_INFO.clone(),
            events: vec![event],
        };

        let serializer = serializer(options);
        match serializer.encode_notification(&notification) {
            Ok(payload) => self.worker.enqueue(delivery_task(
                PayloadKind::Event,
                payload,
                options.endpoints.notify(),
                &notification.api_key,
                options,
                serializer.as_ref(),
            )),
            Err(err) => {
                log::error!("failed to encode event: {}", err);
                false
            }
        }
    }

    fn flush_sessions(&self, summaries: Vec<SessionSummary>) -> Option<SessionPayload> {
        if summaries.is_empty() {
            return None;
        }
        let options = self.options();
        let payload = SessionPayload {
            notifier: NOTIFIER_INFO.clone(),
            app: app_info(&options),
            device: device_info(&options),
            session_counts: summaries,
        };

        let Some(api_key) = options.api_key.as_deref() else {
            faultline_debug!(debug: options.debug; "no api key configured, dropping sessions");
            return Some(payload);
        };
        let serializer = serializer(&options);
        match serializer.encode_sessions(&payload) {
            Ok(bytes) => {
                faultline_debug!(
                    debug: options.debug;
                    "flushing {} session window(s)",
                    payload.session_counts.len()
                );
                self.worker.enqueue(delivery_task(
                    PayloadKind::Session,
                    bytes,
                    options.endpoints.sessions(),
                    api_key,
                    &options,
                    serializer.as_ref(),
                ));
            }
            Err(err) => log::error!("failed to encode sessions: {}", err),
        }
        Some(payload)
    }
}

fn serializer(options: &ClientOptions) -> Arc<dyn Serializer> {
    options
        .serializer
        .clone()
        .unwrap_or_else(|| Arc::new(JsonSerializer))
}

fn delivery_task(
    kind: PayloadKind,
    payload: Vec<u8>,
    endpoint: &Url,
    api_key: &str,
    options: &ClientOptions,
    serializer: &dyn Serializer,
) -> DeliveryTask {
    DeliveryTask {
        kind,
        payload,
        endpoint: endpoint.clone(),
        proxy: options.proxy.clone(),
        headers: vec![
            (API_KEY_HEADER.into(), api_key.into()),
            (PAYLOAD_VERSION_HEADER.into(), PAYLOAD_VERSION.into()),
            (SENT_AT_HEADER.into(), Utc::now().to_rfc3339()),
            ("Content-Type".into(), serializer.content_type().into()),
        ],
    }
}

// Make this unwind safe. It's not out of the box because of the
// callbacks and transports inside `ClientOptions`.
impl RefUnwindSafe for Client {}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(debug: bool) -> Client {
        Client::from(ClientOptions {
            debug,
            session_flush_interval: None,
            ..Default::default()
        })
    }

    #[test]
    fn test_debug_option_is_per_client() {
        let verbose = client(true);
        let quiet = client(false);
        assert!(verbose.inner.worker.is_debug());
        assert!(!quiet.inner.worker.is_debug());

        quiet.configure(|options| options.debug = true);
        verbose.configure(|options| options.debug = false);
        assert!(quiet.inner.worker.is_debug());
        assert!(!verbose.inner.worker.is_debug());
    }
}
