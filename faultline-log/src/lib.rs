//! Adds support for capturing errors from the `log` crate.
//!
//! Records are captured when they are at or above the configured level
//! (`Warn` by default) and carry an error under the structured `error` key.
//! Every other record is only forwarded to the optional destination logger.
//!
//! With the default `backtrace` feature the stack of the logging thread is
//! attached to captured errors, see [`FaultlineLogger::attach_stacktraces`].
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//!
//! use faultline_core::test::TestTransport;
//! use faultline_core::{Client, ClientOptions};
//! use faultline_log::FaultlineLogger;
//!
//! let client = Arc::new(Client::from(ClientOptions {
//!     api_key: Some("0123456789abcdef".into()),
//!     transport: Some(Arc::new(TestTransport::new())),
//!     ..Default::default()
//! }));
//! FaultlineLogger::new(client).install().unwrap();
//!
//! let err = "80a".parse::<u16>().unwrap_err();
//! log::error!(error:err = err; "invalid port in configuration");
//! ```

#![warn(missing_docs)]

mod converters;
mod logger;

pub use converters::{capture_from_record, convert_log_level};
pub use logger::FaultlineLogger;
