//! This crate provides support for reporting errors from Rust applications
//! to an error monitoring service.
//!
//! # Quickstart
//!
//! The most convenient way to use this library is via the [`init`]
//! function, which fills unset options from the environment, creates a
//! [`Client`] and returns a guard.  Keep the guard alive for as long as the
//! application runs: when it is dropped, pending payloads are delivered
//! within the configured shutdown timeout.
//!
//! ```
//! let guard = faultline::init(faultline::ClientOptions {
//!     api_key: Some("0123456789abcdef0123456789abcdef".into()),
//!     ..Default::default()
//! });
//!
//! let error = "80a".parse::<u16>().unwrap_err();
//! guard.client().capture_error(&error);
//! ```
//!
//! Nothing is global: every capture goes through an explicit [`Client`].
//! Integrations such as the logger in [`integrations::log`] take a shared
//! handle to it.
//!
//! # Features
//!
//! Default features:
//!
//! - `backtrace`: Enables [`AttachStacktrace`] to resolve the current stack
//!   into frames.
//! - `transport`: Enables the default HTTP transport, which uses `reqwest`
//!   with `native-tls`.
//!
//! Additional features:
//!
//! - `log`: Enables the [`log`](integrations::log) integration.
//! - `rustls`: Uses `rustls` instead of `native-tls` for the default
//!   transport.
//! - `test`: Enables the [`test`] module with transports that record what
//!   would have been sent.

#![cfg_attr(doc_cfg, feature(doc_cfg))]
#![warn(missing_docs)]

mod defaults;
mod init;
pub mod transports;

// re-export from core
#[doc(inline)]
pub use faultline_core::*;

// added public API
pub use crate::defaults::apply_defaults;
pub use crate::init::{init, ClientInitGuard};

/// Available integrations.
///
/// Integrations turn the output of other libraries into captures.  They are
/// enabled through features of this crate.
pub mod integrations {
    #[cfg(feature = "log")]
    #[cfg_attr(doc_cfg, doc(cfg(feature = "log")))]
    #[doc(inline)]
    pub use faultline_log as log;
}
