//! The provided transports.
//!
//! This module exposes all transports that are compiled into the faultline
//! library.  The `reqwest` feature turns on the HTTP transport.

use std::sync::Arc;

use crate::{ClientOptions, DeliveryError, DeliveryTask, Transport, TransportFactory};

#[cfg(feature = "reqwest")]
mod reqwest;
#[cfg(feature = "reqwest")]
pub use self::reqwest::ReqwestHttpTransport;

/// The default http transport.
#[cfg(feature = "reqwest")]
pub type HttpTransport = ReqwestHttpTransport;

/// Creates the default HTTP transport.
///
/// This is the default value for `transport` on the client options.  It
/// creates a `HttpTransport`.  If no http transport was compiled into the
/// library every delivery fails with [`DeliveryError::Closed`].
#[derive(Clone, Debug, Default)]
pub struct DefaultTransportFactory;

impl TransportFactory for DefaultTransportFactory {
    fn create_transport(&self, options: &ClientOptions) -> Arc<dyn Transport> {
        #[cfg(feature = "reqwest")]
        {
            Arc::new(HttpTransport::new(options))
        }
        #[cfg(not(feature = "reqwest"))]
        {
            let _ = options;
            log::warn!("faultline was compiled without a transport, nothing will be delivered");
            Arc::new(NoTransport)
        }
    }
}

/// A transport that refuses every delivery.
#[cfg_attr(feature = "reqwest", allow(dead_code))]
struct NoTransport;

impl Transport for NoTransport {
    fn deliver(&self, _task: &DeliveryTask) -> Result<(), DeliveryError> {
        Err(DeliveryError::Closed)
    }
}
