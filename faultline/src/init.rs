use std::sync::Arc;

use faultline_core::faultline_debug;

use crate::defaults::apply_defaults;
use crate::{Client, ClientOptions};

/// Helper struct that is returned from `init`.
///
/// When this is dropped the client is stopped: sessions are flushed and
/// pending payloads get `shutdown_timeout` to be delivered.
#[must_use = "when the init guard is dropped the client is stopped and no further \
              errors can be reported.  If you do want to ignore this use mem::forget on it."]
pub struct ClientInitGuard(Arc<Client>);

impl ClientInitGuard {
    /// Quick check if the client is enabled.
    pub fn is_enabled(&self) -> bool {
        self.0.is_enabled()
    }

    /// The client created by [`init`].
    pub fn client(&self) -> &Arc<Client> {
        &self.0
    }
}

impl Drop for ClientInitGuard {
    fn drop(&mut self) {
        let debug = self.0.options().debug;
        if self.is_enabled() {
            faultline_debug!(debug: debug; "dropping client guard -> stopping client");
        } else {
            faultline_debug!(debug: debug; "dropping client guard (client is disabled)");
        }
        self.0.stop(None);
    }
}

/// Creates the faultline client for the given options.
///
/// Unset options are filled from the environment with [`apply_defaults`],
/// which also installs the default HTTP transport.  The returned guard must
/// be kept in scope for the client to drain its queue before the
/// application exits.
///
/// # Examples
///
/// ```
/// let _faultline = faultline::init(faultline::ClientOptions {
///     api_key: Some("0123456789abcdef0123456789abcdef".into()),
///     app_version: Some("1.0.0".into()),
///     ..Default::default()
/// });
/// ```
///
/// Or if draining on shutdown should be ignored:
///
/// ```
/// std::mem::forget(faultline::init(faultline::ClientOptions::default()));
/// ```
pub fn init<O: Into<ClientOptions>>(options: O) -> ClientInitGuard {
    let client = Arc::new(Client::from(apply_defaults(options.into())));
    let debug = client.options().debug;
    if client.is_enabled() {
        faultline_debug!(
            debug: debug;
            "enabled faultline client for {}",
            client.options().endpoints.notify()
        );
    } else {
        faultline_debug!(
            debug: debug;
            "initialized disabled faultline client due to missing api key"
        );
    }
    ClientInitGuard(client)
}
