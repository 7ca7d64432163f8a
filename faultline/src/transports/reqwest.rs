use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use reqwest::blocking::Client as ReqwestClient;

use faultline_core::faultline_debug;

use crate::types::Proxy;
use crate::{ClientOptions, DeliveryError, DeliveryTask, Transport};

/// A [`Transport`] that delivers payloads via the [`reqwest`] library.
///
/// When the `transport` feature is enabled this will currently
/// be the default transport.  This is separately enabled by the
/// `reqwest` feature flag.
///
/// Requests are blocking; they only ever run on the delivery worker
/// threads.  One HTTP client is kept per proxy, since the proxy of a task
/// follows the options that were current when the payload was produced.
///
/// [`reqwest`]: https://crates.io/crates/reqwest
#[cfg_attr(doc_cfg, doc(cfg(feature = "reqwest")))]
pub struct ReqwestHttpTransport {
    clients: Mutex<HashMap<Option<Proxy>, ReqwestClient>>,
    closed: AtomicBool,
    debug: bool,
}

#[cfg_attr(doc_cfg, doc(cfg(feature = "reqwest")))]
impl ReqwestHttpTransport {
    /// Creates a new Transport.
    pub fn new(options: &ClientOptions) -> Self {
        Self::new_internal(options, None)
    }

    /// Creates a new Transport that uses the specified [`ReqwestClient`]
    /// for payloads without a proxy.
    pub fn with_client(options: &ClientOptions, client: ReqwestClient) -> Self {
        Self::new_internal(options, Some(client))
    }

    fn new_internal(options: &ClientOptions, client: Option<ReqwestClient>) -> Self {
        let mut clients = HashMap::new();
        if let Some(client) = client {
            clients.insert(None, client);
        }
        ReqwestHttpTransport {
            clients: Mutex::new(clients),
            closed: AtomicBool::new(false),
            debug: options.debug,
        }
    }

    fn client_for(&self, proxy: Option<&Proxy>) -> Result<ReqwestClient, DeliveryError> {
        let mut clients = self.clients.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(client) = clients.get(&proxy.cloned()) {
            return Ok(client.clone());
        }

        let mut builder = ReqwestClient::builder();
        if let Some(proxy) = proxy {
            faultline_debug!(
                debug: self.debug;
                "creating http client for proxy {}",
                proxy.address()
            );
            builder = builder.proxy(
                reqwest::Proxy::all(proxy.url().as_str())
                    .map_err(|err| DeliveryError::Request(err.to_string()))?,
            );
        }
        let client = builder
            .build()
            .map_err(|err| DeliveryError::Request(err.to_string()))?;
        clients.insert(proxy.cloned(), client.clone());
        Ok(client)
    }
}

#[cfg_attr(doc_cfg, doc(cfg(feature = "reqwest")))]
impl Transport for ReqwestHttpTransport {
    fn deliver(&self, task: &DeliveryTask) -> Result<(), DeliveryError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(DeliveryError::Closed);
        }

        let client = self.client_for(task.proxy.as_ref())?;
        let mut request = client.post(task.endpoint.clone()).body(task.payload.clone());
        for (name, value) in &task.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request
            .send()
            .map_err(|err| DeliveryError::Request(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::Status(status.as_u16()));
        }
        faultline_debug!(
            debug: self.debug;
            "delivered {} payload (status {})",
            task.kind,
            status
        );
        Ok(())
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.clients
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
