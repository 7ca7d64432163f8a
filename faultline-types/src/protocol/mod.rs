//! This module exposes the types that flow through the notifier pipeline.
//!
//! Raw data enters as a [`RawCapture`], is turned into a mutable
//! [`EventDraft`] and frozen into an [`Event`] that is wrapped into a
//! [`Notification`] for delivery.  Sessions are reported independently as
//! [`SessionPayload`]s.

mod capture;
mod event;
mod metadata;
mod session;

pub use self::capture::*;
pub use self::event::*;
pub use self::metadata::*;
pub use self::session::*;

/// The version of the payload layout produced by this crate.
pub const PAYLOAD_VERSION: &str = "4";

/// Value type used for metadata entries.
pub use serde_json::Value;
