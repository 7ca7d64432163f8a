//! This crate provides the core of the faultline notifier, which captures
//! errors and session activity and delivers them asynchronously.
//!
//! `faultline-core` is meant for integration authors and for applications
//! that bring their own transport.  Regular users should use the
//! [`faultline`] crate, which comes with a default HTTP transport and reads
//! its configuration from the environment.
//!
//! # Core Concepts
//!
//! Everything is driven by an explicitly constructed [`Client`].  A capture
//! travels through a fixed pipeline:
//!
//! 1. the capture gate ([`Client::should_capture`]) drops ignored error
//!    classes, errors raised by the notifier itself and errors from release
//!    stages that should not notify,
//! 2. an [`EventDraft`](protocol::EventDraft) is built and stack frames are
//!    classified as in-project or library code,
//! 3. the registered [`Callback`]s run in order and may enrich or suppress
//!    the draft,
//! 4. sensitive metadata is redacted,
//! 5. the frozen event is serialized and queued for the delivery workers.
//!
//! Only step 5 involves I/O and it never happens on the calling thread.
//!
//! Sessions are counted in one-minute windows and flushed by a background
//! thread, or explicitly through [`Client::tick`].
//!
//! # Shutdown
//!
//! [`Client::stop`] stops accepting work and waits for queued deliveries up
//! to the configured grace period.  Whatever is left after that is dropped
//! and reported as a single warning.
//!
//! # Features
//!
//! - `feature = "backtrace"`: Enables [`AttachStacktrace`] and
//!   [`current_thread`] to resolve the current stack into raw frames.
//! - `feature = "test"`: Activates the [`test`] module, which can be used to
//!   write integration tests. It comes with transports which record all
//!   delivered payloads for inspection.
//!
//! [`faultline`]: https://crates.io/crates/faultline

#![warn(missing_docs)]

// macros; these need to be first to be used by other modules
#[macro_use]
mod macros;

#[cfg(feature = "backtrace")]
mod backtrace_support;
mod builder;
mod callbacks;
mod client;
mod clientoptions;
mod constants;
mod error;
mod gate;
mod redact;
mod scope;
mod session;
mod transport;
mod utils;
mod worker;

// public api or exports from this crate
#[cfg(feature = "backtrace")]
pub use crate::backtrace_support::{current_frames, current_thread, AttachStacktrace};
pub use crate::builder::build_event;
pub use crate::callbacks::{run_callbacks, Callback, MutationOutcome};
pub use crate::client::Client;
pub use crate::clientoptions::ClientOptions;
pub use crate::constants::{DEFAULT_RELEASE_STAGE, FILTERED, NOTIFIER_INFO, VERSION};
pub use crate::error::{DeliveryError, EncodeError};
pub use crate::gate::{should_capture, Rejection};
pub use crate::redact::{is_in_project, redact};
pub use crate::scope::Scope;
pub use crate::session::SessionAggregator;
pub use crate::transport::{
    DeliveryTask, JsonSerializer, PayloadKind, Serializer, Transport, TransportFactory,
};

// test utilities
#[cfg(feature = "test")]
pub mod test;

// public api from other crates
#[doc(inline)]
pub use faultline_types as types;
pub use faultline_types::protocol;
pub use faultline_types::protocol::{
    EventDraft, Metadata, RawCapture, RawException, RawFrame, Severity, User,
};

#[doc(hidden)]
pub use crate::macros::debug_level as __debug_level;
#[doc(hidden)]
pub use log as __log;
