//! This crate provides the common types shared by the faultline notifier
//! crates: the raw capture handed over at the instrumentation boundary, the
//! event and session payloads that end up on the wire, and the endpoint
//! configuration they are delivered to.
//!
//! Most of the types in this crate are serializable with `serde`.  The
//! wire format itself is not prescribed here; the core crate only requires
//! something that can turn a [`protocol::Notification`] or a
//! [`protocol::SessionPayload`] into bytes.
//!
//! ## API Concepts
//!
//! Most types implement `Default` so that objects can be created
//! conveniently and missing attributes can be filled in:
//!
//! ```rust
//! use faultline_types::protocol::{RawCapture, RawException, Severity};
//!
//! let capture = RawCapture::new(RawException::new("IoError", "disk full"))
//!     .with_severity(Severity::Error);
//! assert_eq!(capture.exception.type_name, "IoError");
//! ```
#![warn(missing_docs)]

mod endpoints;
pub mod protocol;

pub use crate::endpoints::*;

// Re-export external types and traits for convenience
pub use chrono::{DateTime, Utc};
pub use url::Url;
pub use uuid::Uuid;

/// Generates a random [Uuid] for session and event identifiers.
pub fn random_uuid() -> Uuid {
    Uuid::new_v4()
}
