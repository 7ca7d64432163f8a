use std::borrow::Cow;
use std::env;
use std::sync::Arc;

use crate::transports::DefaultTransportFactory;
use crate::types::{Endpoints, Proxy};
use crate::ClientOptions;

/// Apply default client options.
///
/// Every option that is not already set is filled in:
///
/// - `transport` becomes the [`DefaultTransportFactory`].
/// - `api_key` is read from `FAULTLINE_API_KEY`.
/// - `release_stage` is read from `FAULTLINE_RELEASE_STAGE`, falling back to
///   `development` in debug builds and `production` otherwise.
/// - `app_version` is read from `FAULTLINE_APP_VERSION`.
/// - `hostname` is the name of the host.
/// - default `endpoints` are replaced by `FAULTLINE_NOTIFY_ENDPOINT` and
///   `FAULTLINE_SESSIONS_ENDPOINT` if either is set.
/// - `proxy` is read from `HTTPS_PROXY` (or `https_proxy`).
///
/// # Examples
///
/// ```
/// std::env::set_var("FAULTLINE_RELEASE_STAGE", "staging");
///
/// let options = faultline::apply_defaults(Default::default());
/// assert_eq!(options.release_stage(), "staging");
/// ```
pub fn apply_defaults(mut opts: ClientOptions) -> ClientOptions {
    if opts.transport.is_none() {
        opts.transport = Some(Arc::new(DefaultTransportFactory));
    }
    if opts.api_key.is_none() {
        opts.api_key = env::var("FAULTLINE_API_KEY").ok().map(Cow::Owned);
    }
    if opts.release_stage.is_none() {
        opts.release_stage = env::var("FAULTLINE_RELEASE_STAGE")
            .ok()
            .map(Cow::Owned)
            .or_else(|| {
                Some(Cow::Borrowed(if cfg!(debug_assertions) {
                    "development"
                } else {
                    "production"
                }))
            });
    }
    if opts.app_version.is_none() {
        opts.app_version = env::var("FAULTLINE_APP_VERSION").ok().map(Cow::Owned);
    }
    if opts.hostname.is_none() {
        opts.hostname = hostname::get()
            .ok()
            .and_then(|s| s.into_string().ok())
            .map(Cow::Owned);
    }
    if opts.endpoints == Endpoints::default() {
        let notify = env::var("FAULTLINE_NOTIFY_ENDPOINT").ok();
        let sessions = env::var("FAULTLINE_SESSIONS_ENDPOINT").ok();
        if notify.is_some() || sessions.is_some() {
            let notify = notify.unwrap_or_else(|| opts.endpoints.notify().to_string());
            let sessions = sessions.unwrap_or_else(|| opts.endpoints.sessions().to_string());
            match Endpoints::new(&notify, &sessions) {
                Ok(endpoints) => opts.endpoints = endpoints,
                Err(err) => log::warn!("ignoring endpoints from the environment: {}", err),
            }
        }
    }
    if opts.proxy.is_none() {
        opts.proxy = env::var("HTTPS_PROXY")
            .ok()
            .or_else(|| env::var("https_proxy").ok())
            .and_then(|url| match url.parse::<Proxy>() {
                Ok(proxy) => Some(proxy),
                Err(err) => {
                    log::warn!("ignoring proxy from the environment: {}", err);
                    None
                }
            });
    }
    opts
}
