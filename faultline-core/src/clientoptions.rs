use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::callbacks::Callback;
use crate::constants::DEFAULT_RELEASE_STAGE;
use crate::transport::{Serializer, TransportFactory};
use crate::types::{Endpoints, Proxy};

/// Configuration settings for the client.
///
/// A client keeps an immutable snapshot of its options.  Use
/// [`Client::configure`](crate::Client::configure) to replace it at runtime;
/// captures that are already running keep the snapshot they started with.
///
/// # Examples
///
/// ```
/// let _options = faultline_core::ClientOptions {
///     api_key: Some("0123456789abcdef".into()),
///     release_stage: Some("staging".into()),
///     ..Default::default()
/// };
/// ```
#[derive(Clone)]
pub struct ClientOptions {
    /// The api key payloads are delivered with.  If not set the client is
    /// effectively disabled.
    pub api_key: Option<Cow<'static, str>>,
    /// Enables debug mode.
    ///
    /// In debug mode internal diagnostics are logged at `info` instead of
    /// `debug` level on the `faultline` target.
    pub debug: bool,
    /// The release stage of the application, e.g. `production`.
    pub release_stage: Option<Cow<'static, str>>,
    /// The version of the application.
    pub app_version: Option<Cow<'static, str>>,
    /// The kind of application, e.g. `worker`.
    pub app_type: Option<Cow<'static, str>>,
    /// The host name to report.
    pub hostname: Option<Cow<'static, str>>,
    /// Module prefixes that belong to the application.
    pub project_packages: Vec<Cow<'static, str>>,
    /// Error type names that are never reported.
    pub ignore_classes: Vec<Cow<'static, str>>,
    /// Release stages that report errors.  Empty means all stages do.
    pub notify_release_stages: Vec<Cow<'static, str>>,
    /// Metadata keys containing any of these tokens are redacted.
    /// (defaults to `["password"]`)
    pub filters: Vec<Cow<'static, str>>,
    /// Callbacks run in order before an event is delivered.
    pub callbacks: Vec<Arc<dyn Callback>>,
    /// Where events and sessions are delivered.
    pub endpoints: Endpoints,
    /// An optional proxy deliveries are routed through.
    pub proxy: Option<Proxy>,
    /// Number of delivery threads. (defaults to 2)
    pub worker_count: usize,
    /// How long shutdown waits for pending deliveries. (defaults to 1s)
    pub shutdown_timeout: Duration,
    /// How often sessions are flushed in the background.  `None` disables
    /// the background flusher. (defaults to 30s)
    pub session_flush_interval: Option<Duration>,
    /// Whether thread snapshots are attached to events. (defaults to true)
    pub send_threads: bool,
    /// The transport for events.
    pub transport: Option<Arc<dyn TransportFactory>>,
    /// The transport for sessions.  Falls back to `transport`.
    pub session_transport: Option<Arc<dyn TransportFactory>>,
    /// The serializer for payloads.  Defaults to JSON.
    pub serializer: Option<Arc<dyn Serializer>>,
}

impl ClientOptions {
    /// Creates new Options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates new Options and immediately configures them.
    pub fn configure<F>(f: F) -> Self
    where
        F: FnOnce(&mut ClientOptions) -> &mut ClientOptions,
    {
        let mut opts = Self::new();
        f(&mut opts);
        opts
    }

    /// Sets the api key.
    pub fn set_api_key<S: Into<Cow<'static, str>>>(&mut self, api_key: S) -> &mut Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Sets the release stage.
    pub fn set_release_stage<S: Into<Cow<'static, str>>>(&mut self, stage: S) -> &mut Self {
        self.release_stage = Some(stage.into());
        self
    }

    /// The effective release stage.
    pub fn release_stage(&self) -> &str {
        self.release_stage.as_deref().unwrap_or(DEFAULT_RELEASE_STAGE)
    }

    /// Sets the application version.
    pub fn set_app_version<S: Into<Cow<'static, str>>>(&mut self, version: S) -> &mut Self {
        self.app_version = Some(version.into());
        self
    }

    /// Sets the application type.
    pub fn set_app_type<S: Into<Cow<'static, str>>>(&mut self, app_type: S) -> &mut Self {
        self.app_type = Some(app_type.into());
        self
    }

    /// Adds module prefixes that belong to the application.
    pub fn add_project_packages<I>(&mut self, packages: I) -> &mut Self
    where
        I: IntoIterator,
        I::Item: Into<Cow<'static, str>>,
    {
        self.project_packages
            .extend(packages.into_iter().map(Into::into));
        self
    }

    /// Adds error type names that are never reported.
    pub fn add_ignore_classes<I>(&mut self, classes: I) -> &mut Self
    where
        I: IntoIterator,
        I::Item: Into<Cow<'static, str>>,
    {
        self.ignore_classes.extend(classes.into_iter().map(Into::into));
        self
    }

    /// Sets the release stages that report errors.
    pub fn set_notify_release_stages<I>(&mut self, stages: I) -> &mut Self
    where
        I: IntoIterator,
        I::Item: Into<Cow<'static, str>>,
    {
        self.notify_release_stages = stages.into_iter().map(Into::into).collect();
        self
    }

    /// Replaces the metadata filter tokens.
    pub fn set_filters<I>(&mut self, filters: I) -> &mut Self
    where
        I: IntoIterator,
        I::Item: Into<Cow<'static, str>>,
    {
        self.filters = filters.into_iter().map(Into::into).collect();
        self
    }

    /// Appends a callback to the callback chain.
    pub fn add_callback<C: Callback + 'static>(&mut self, callback: C) -> &mut Self {
        self.callbacks.push(Arc::new(callback));
        self
    }

    /// Sets the delivery endpoints.
    pub fn set_endpoints(&mut self, endpoints: Endpoints) -> &mut Self {
        self.endpoints = endpoints;
        self
    }

    /// Sets the proxy deliveries are routed through.
    pub fn set_proxy(&mut self, proxy: Option<Proxy>) -> &mut Self {
        self.proxy = proxy;
        self
    }

    /// Sets the transport for events, and for sessions unless a separate
    /// session transport is configured.
    pub fn set_transport<F>(&mut self, transport: F) -> &mut Self
    where
        F: TransportFactory + 'static,
    {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Sets a separate transport for sessions.
    pub fn set_session_transport<F>(&mut self, transport: F) -> &mut Self
    where
        F: TransportFactory + 'static,
    {
        self.session_transport = Some(Arc::new(transport));
        self
    }

    /// Sets the serializer.
    pub fn set_serializer<S>(&mut self, serializer: S) -> &mut Self
    where
        S: Serializer + 'static,
    {
        self.serializer = Some(Arc::new(serializer));
        self
    }
}

impl fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        #[derive(Debug)]
        struct TransportFactory;
        #[derive(Debug)]
        struct Serializer;

        f.debug_struct("ClientOptions")
            .field("api_key", &self.api_key.as_ref().map(|_| "[redacted]"))
            .field("debug", &self.debug)
            .field("release_stage", &self.release_stage)
            .field("app_version", &self.app_version)
            .field("app_type", &self.app_type)
            .field("hostname", &self.hostname)
            .field("project_packages", &self.project_packages)
            .field("ignore_classes", &self.ignore_classes)
            .field("notify_release_stages", &self.notify_release_stages)
            .field("filters", &self.filters)
            .field("callbacks", &self.callbacks.len())
            .field("endpoints", &self.endpoints)
            .field("proxy", &self.proxy)
            .field("worker_count", &self.worker_count)
            .field("shutdown_timeout", &self.shutdown_timeout)
            .field("session_flush_interval", &self.session_flush_interval)
            .field("send_threads", &self.send_threads)
            .field("transport", &self.transport.as_ref().map(|_| TransportFactory))
            .field(
                "session_transport",
                &self.session_transport.as_ref().map(|_| TransportFactory),
            )
            .field("serializer", &self.serializer.as_ref().map(|_| Serializer))
            .finish()
    }
}

impl Default for ClientOptions {
    fn default() -> ClientOptions {
        ClientOptions {
            api_key: None,
            debug: false,
            release_stage: None,
            app_version: None,
            app_type: None,
            hostname: None,
            project_packages: vec![],
            ignore_classes: vec![],
            notify_release_stages: vec![],
            filters: vec![Cow::Borrowed("password")],
            callbacks: vec![],
            endpoints: Endpoints::default(),
            proxy: None,
            worker_count: 2,
            shutdown_timeout: Duration::from_secs(1),
            session_flush_interval: Some(Duration::from_secs(30)),
            send_threads: true,
            transport: None,
            session_transport: None,
            serializer: None,
        }
    }
}
