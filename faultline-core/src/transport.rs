use std::fmt;
use std::sync::Arc;

use crate::error::{DeliveryError, EncodeError};
use crate::protocol::{Notification, SessionPayload};
use crate::types::{Proxy, Url};
use crate::ClientOptions;

/// The kind of payload carried by a [`DeliveryTask`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadKind {
    /// A serialized [`Notification`].
    Event,
    /// A serialized [`SessionPayload`].
    Session,
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayloadKind::Event => write!(f, "event"),
            PayloadKind::Session => write!(f, "session"),
        }
    }
}

/// A serialized payload waiting for delivery.
///
/// Tasks are built with the configuration that was current when the payload
/// was produced and are consumed exactly once by a delivery worker.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryTask {
    /// What the payload contains.
    pub kind: PayloadKind,
    /// The encoded body.
    pub payload: Vec<u8>,
    /// Where the payload is sent.
    pub endpoint: Url,
    /// The proxy to route the request through.
    pub proxy: Option<Proxy>,
    /// Request headers.
    pub headers: Vec<(String, String)>,
}

impl DeliveryTask {
    /// Looks up a header by name, ignoring case.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// The trait for transports.
///
/// A transport is responsible for sending a [`DeliveryTask`] to its
/// endpoint.  It is only ever called from the delivery worker threads, so
/// `deliver` may block.
pub trait Transport: Send + Sync + 'static {
    /// Sends a payload.
    fn deliver(&self, task: &DeliveryTask) -> Result<(), DeliveryError>;

    /// Releases the resources held by the transport.
    fn close(&self) {}
}

/// A factory creating transport instances.
///
/// Because options are potentially reused between different clients the
/// options do not actually contain a transport but a factory object that
/// can create transports instead.
///
/// The factory has a single method that creates a new arced transport.
/// Because transports can be wrapped in `Arc`s and those are clonable
/// any `Arc<Transport>` is also a valid transport factory.  This for
/// instance lets you put a `Arc<TestTransport>` directly into the options.
pub trait TransportFactory: Send + Sync {
    /// Given some options creates a transport.
    fn create_transport(&self, options: &ClientOptions) -> Arc<dyn Transport>;
}

impl<F> TransportFactory for F
where
    F: Fn(&ClientOptions) -> Arc<dyn Transport> + Clone + Send + Sync + 'static,
{
    fn create_transport(&self, options: &ClientOptions) -> Arc<dyn Transport> {
        (*self)(options)
    }
}

impl<T: Transport> TransportFactory for Arc<T> {
    fn create_transport(&self, options: &ClientOptions) -> Arc<dyn Transport> {
        let _options = options;
        self.clone()
    }
}

/// Turns payloads into bytes.
pub trait Serializer: Send + Sync {
    /// Encodes an error notification.
    fn encode_notification(&self, notification: &Notification) -> Result<Vec<u8>, EncodeError>;

    /// Encodes a session payload.
    fn encode_sessions(&self, payload: &SessionPayload) -> Result<Vec<u8>, EncodeError>;

    /// The media type of the encoded payloads.
    fn content_type(&self) -> &str {
        "application/json"
    }
}

/// The default [`Serializer`], producing JSON.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn encode_notification(&self, notification: &Notification) -> Result<Vec<u8>, EncodeError> {
        Ok(serde_json::to_vec(notification)?)
    }

    fn encode_sessions(&self, payload: &SessionPayload) -> Result<Vec<u8>, EncodeError> {
        Ok(serde_json::to_vec(payload)?)
    }
}
